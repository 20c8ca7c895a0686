// 该文件是 Rizhao （日照） 项目的一部分。
// src/output/record.rs - 检测记录输出
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

use std::path::PathBuf;

use tracing::info;

use crate::{
  detector::DetectionOutput,
  model::format_record_line,
  output::{Render, save_image_file::create_parent_dir},
};

/// 将检测结果写成可被 `record://` 模型回放的文本
pub struct RecordOutput {
  path: PathBuf,
}

impl RecordOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

impl Render<DetectionOutput> for RecordOutput {
  type Error = std::io::Error;

  fn render_result(&self, result: &DetectionOutput) -> Result<(), Self::Error> {
    let records: Vec<String> = result
      .to_detect_result()
      .items
      .iter()
      .map(format_record_line)
      .collect();

    create_parent_dir(&self.path)?;
    std::fs::write(&self.path, records.join("\n"))?;
    info!("保存检测记录到文件: {}", self.path.display());
    Ok(())
  }
}
