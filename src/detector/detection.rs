// 该文件是 Rizhao （日照） 项目的一部分。
// src/detector/detection.rs - 检测结果
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

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DetectionError {
  #[error("边界框坐标不是有限数值: ({0}, {1}, {2}, {3})")]
  NonFinite(f64, f64, f64, f64),
  #[error("边界框退化: x {xmin}..{xmax}, y {ymin}..{ymax}")]
  Degenerate {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
  },
  #[error("置信度超出 [0, 1]: {0}")]
  ConfidenceOutOfRange(f32),
}

/// 像素坐标下的轴对齐边界框，保证 xmin < xmax 且 ymin < ymax
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
  xmin: f64,
  ymin: f64,
  xmax: f64,
  ymax: f64,
}

impl BoundingBox {
  pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self, DetectionError> {
    if ![xmin, ymin, xmax, ymax].iter().all(|v| v.is_finite()) {
      return Err(DetectionError::NonFinite(xmin, ymin, xmax, ymax));
    }
    if xmin >= xmax || ymin >= ymax {
      return Err(DetectionError::Degenerate {
        xmin,
        ymin,
        xmax,
        ymax,
      });
    }

    Ok(Self {
      xmin,
      ymin,
      xmax,
      ymax,
    })
  }

  /// 由归一化坐标 [x_min, y_min, x_max, y_max] 换算到 width x height 的图像
  pub fn from_normalized(bbox: [f32; 4], width: u32, height: u32) -> Result<Self, DetectionError> {
    let (w, h) = (f64::from(width), f64::from(height));
    Self::new(
      f64::from(bbox[0]) * w,
      f64::from(bbox[1]) * h,
      f64::from(bbox[2]) * w,
      f64::from(bbox[3]) * h,
    )
  }

  pub fn to_normalized(&self, width: u32, height: u32) -> [f32; 4] {
    let (w, h) = (f64::from(width), f64::from(height));
    [
      (self.xmin / w) as f32,
      (self.ymin / h) as f32,
      (self.xmax / w) as f32,
      (self.ymax / h) as f32,
    ]
  }

  pub fn xmin(&self) -> f64 {
    self.xmin
  }

  pub fn ymin(&self) -> f64 {
    self.ymin
  }

  pub fn xmax(&self) -> f64 {
    self.xmax
  }

  pub fn ymax(&self) -> f64 {
    self.ymax
  }

  pub fn width(&self) -> f64 {
    self.xmax - self.xmin
  }

  pub fn height(&self) -> f64 {
    self.ymax - self.ymin
  }

  pub fn area_px(&self) -> f64 {
    self.width() * self.height()
  }
}

/// 单个检测目标，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  label: String,
  confidence: f32,
  #[serde(flatten)]
  bbox: BoundingBox,
}

impl Detection {
  pub fn new(
    label: impl Into<String>,
    confidence: f32,
    bbox: BoundingBox,
  ) -> Result<Self, DetectionError> {
    if !(0.0..=1.0).contains(&confidence) {
      return Err(DetectionError::ConfidenceOutOfRange(confidence));
    }

    Ok(Self {
      label: label.into(),
      confidence,
      bbox,
    })
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn confidence(&self) -> f32 {
    self.confidence
  }

  pub fn bbox(&self) -> &BoundingBox {
    &self.bbox
  }

  pub fn area_px(&self) -> f64 {
    self.bbox.area_px()
  }
}
