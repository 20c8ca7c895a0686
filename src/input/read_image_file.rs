// 该文件是 Rizhao （日照） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error};

use crate::frame::SourceFrame;

/// 航拍/卫星图像支持的文件扩展名
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "tif", "tiff"];

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("图像文件不存在: {0}")]
  NotFound(PathBuf),
  #[error("不支持的图像格式: {0}")]
  UnsupportedFormat(String),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 单张图像文件输入
#[derive(Debug, Clone)]
pub struct ImageFileInput {
  path: PathBuf,
}

impl ImageFileInput {
  /// 检查路径是否指向受支持的图像文件，不解码内容
  pub fn new(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    if !path.is_file() {
      error!("图像文件不存在: {}", path.display());
      return Err(ImageFileInputError::NotFound(path.to_path_buf()));
    }

    let extension = path
      .extension()
      .and_then(|ext| ext.to_str())
      .map(str::to_ascii_lowercase)
      .unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
      error!(
        "不支持的图像格式 '{}', 支持: {}",
        extension,
        SUPPORTED_EXTENSIONS.join(", ")
      );
      return Err(ImageFileInputError::UnsupportedFormat(extension));
    }

    Ok(Self {
      path: path.to_path_buf(),
    })
  }

  pub fn read(self) -> Result<SourceFrame, ImageFileInputError> {
    // 格式按文件内容判断，扩展名只用于准入
    let image = ImageReader::open(&self.path)?
      .with_guessed_format()?
      .decode()?
      .to_rgb8();
    debug!(
      "读取图像 {}: {}x{}",
      self.path.display(),
      image.width(),
      image.height()
    );

    Ok(SourceFrame::new(self.path, image))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};
  use tempfile::TempDir;

  #[test]
  fn reads_png_with_original_dimensions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("roof.png");
    RgbImage::from_pixel(40, 30, Rgb([200, 10, 10]))
      .save(&path)
      .unwrap();

    let frame = ImageFileInput::new(&path).unwrap().read().unwrap();
    assert_eq!((frame.width(), frame.height()), (40, 30));
  }

  #[test]
  fn extension_check_is_case_insensitive() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ROOF.TIFF");
    RgbImage::new(4, 4).save_with_format(&path, image::ImageFormat::Tiff).unwrap();

    assert!(ImageFileInput::new(&path).is_ok());
  }

  #[test]
  fn rejects_missing_file() {
    let result = ImageFileInput::new("/nonexistent/roof.png");
    assert!(matches!(result, Err(ImageFileInputError::NotFound(_))));
  }

  #[test]
  fn rejects_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("roof.gif");
    std::fs::write(&path, b"GIF89a").unwrap();

    let result = ImageFileInput::new(&path);
    assert!(matches!(
      result,
      Err(ImageFileInputError::UnsupportedFormat(ext)) if ext == "gif"
    ));
  }

  #[test]
  fn undecodable_content_is_a_load_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"not really a jpeg").unwrap();

    let result = ImageFileInput::new(&path).unwrap().read();
    assert!(matches!(result, Err(ImageFileInputError::ImageLoadError(_))));
  }
}
