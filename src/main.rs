// 该文件是 Rizhao （日照） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rizhao::{
  args::Args,
  config::Settings,
  detector::DetectorAdapter,
  irradiance::{IrradianceProvider, ReqwestTransport},
  output::{JsonReportOutput, RecordOutput, Render, SaveImageFileOutput, TextReport, draw::Draw},
  session::{Session, SessionError},
};

// 图像缺失或格式不受支持
const EXIT_BAD_IMAGE: u8 = 2;

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  match run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      if let Some(SessionError::Image(image_error)) = e.downcast_ref::<SessionError>() {
        eprintln!("请提供有效的图像文件: {}", image_error);
        return ExitCode::from(EXIT_BAD_IMAGE);
      }
      error!("{:#}", e);
      eprintln!("错误: {:#}", e);
      ExitCode::FAILURE
    }
  }
}

fn run(args: &Args) -> Result<()> {
  let settings = Settings::load(args)?;

  info!("模型: {}", settings.model);
  info!(
    "位置: 纬度 {}, 经度 {}",
    settings.location.latitude, settings.location.longitude
  );

  let draw = match &settings.font {
    Some(font) => Draw::with_font_file(font)?,
    None => Draw::default(),
  };
  let detector = DetectorAdapter::new(settings.catalog.clone(), settings.labels.clone(), draw);

  let transport = ReqwestTransport::new(settings.timeout).context("创建 HTTP 客户端失败")?;
  let provider = IrradianceProvider::new(settings.pvgis_url.clone(), transport);

  let mut session = Session::new(settings, provider, detector);
  let outcome = session.analyze(&args.image)?;

  println!("{}", TextReport(&outcome.report));

  let settings = session.settings();
  if let Some(path) = &settings.output {
    SaveImageFileOutput::new(path).render_result(&outcome.detection)?;
  }
  if let Some(path) = &settings.record {
    RecordOutput::new(path).render_result(&outcome.detection)?;
  }
  if let Some(path) = &settings.report {
    JsonReportOutput::new(path).render_result(&outcome.report)?;
  }

  Ok(())
}
