// 该文件是 Rizhao （日照） 项目的一部分。
// src/output/report.rs - 分析报告
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

use std::{
  fmt,
  fs::File,
  io::{BufWriter, Write},
  path::PathBuf,
};

use thiserror::Error;
use tracing::info;

use crate::{
  irradiance::Provenance,
  output::{Render, save_image_file::create_parent_dir},
  session::SessionReport,
};

/// 终端文本报告，数值仅在显示时保留两位小数
pub struct TextReport<'a>(pub &'a SessionReport);

impl fmt::Display for TextReport<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let report = self.0;

    writeln!(
      f,
      "图像: {} ({} x {} 像素)",
      report.image.display(),
      report.width,
      report.height
    )?;
    writeln!(f, "模型: {}", report.model)?;
    writeln!(
      f,
      "位置: 纬度 {}, 经度 {}",
      report.location.latitude, report.location.longitude
    )?;
    writeln!(f, "像素比例: {} m/px", report.scale_m_per_px)?;
    writeln!(f)?;

    if report.areas.items.is_empty() {
      writeln!(f, "未检测到太阳能板")?;
    } else {
      writeln!(f, "检测结果:")?;
      writeln!(
        f,
        "{:>4}  {:<16} {:>8} {:>12} {:>12}",
        "序号", "标签", "置信度", "面积(px)", "面积(m²)"
      )?;
      for (idx, item) in report.areas.items.iter().enumerate() {
        writeln!(
          f,
          "{:>4}  {:<16} {:>8.2} {:>12.2} {:>12.2}",
          idx + 1,
          item.detection.label(),
          item.detection.confidence(),
          item.area_px,
          item.area_m2
        )?;
      }
    }
    writeln!(
      f,
      "总面积: {:.2} px, {:.2} m²",
      report.areas.total_area_px, report.areas.total_area_m2
    )?;
    writeln!(f)?;

    match &report.irradiance.provenance {
      Provenance::Fetched { url } => writeln!(
        f,
        "辐照度: {:.2} kWh/m²/day (PVGIS: {})",
        report.irradiance.kwh_per_m2_day, url
      )?,
      Provenance::Manual => writeln!(
        f,
        "辐照度: {:.2} kWh/m²/day (手动输入)",
        report.irradiance.kwh_per_m2_day
      )?,
    }
    if let Some(fallback) = &report.irradiance_fallback {
      writeln!(f, "  PVGIS 查询失败: {}", fallback.error)?;
      writeln!(f, "  请求地址: {}", fallback.url)?;
    }

    writeln!(
      f,
      "组件效率: {:.2} %, 系统损耗: {:.2} %",
      report.parameters.panel_efficiency * 100.0,
      report.parameters.system_loss * 100.0
    )?;
    writeln!(f, "预计日发电量: {:.2} kWh", report.energy.daily_kwh)?;
    write!(f, "预计年发电量: {:.2} kWh", report.energy.yearly_kwh)
  }
}

#[derive(Error, Debug)]
pub enum JsonReportError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

pub struct JsonReportOutput {
  path: PathBuf,
}

impl JsonReportOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

impl Render<SessionReport> for JsonReportOutput {
  type Error = JsonReportError;

  fn render_result(&self, result: &SessionReport) -> Result<(), Self::Error> {
    create_parent_dir(&self.path)?;
    let mut writer = BufWriter::new(File::create(&self.path)?);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.flush()?;
    info!("保存分析报告到文件: {}", self.path.display());
    Ok(())
  }
}
