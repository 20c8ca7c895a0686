// 该文件是 Rizhao （日照） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::{detector::DetectionOutput, output::Render};

pub struct SaveImageFileOutput {
  path: PathBuf,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

impl Render<DetectionOutput> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, result: &DetectionOutput) -> Result<(), Self::Error> {
    create_parent_dir(&self.path)?;
    result.annotated.save(&self.path)?;
    info!("保存标注图像到文件: {}", self.path.display());
    Ok(())
  }
}

pub(crate) fn create_parent_dir(path: &Path) -> Result<(), std::io::Error> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;
  use tempfile::TempDir;

  #[test]
  fn saves_annotated_image_creating_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out/nested/annotated.png");
    let output = DetectionOutput {
      model: "Model1".into(),
      width: 6,
      height: 4,
      annotated: RgbImage::new(6, 4),
      detections: Vec::new(),
    };

    SaveImageFileOutput::new(&path).render_result(&output).unwrap();
    assert_eq!(image::image_dimensions(&path).unwrap(), (6, 4));
  }
}
