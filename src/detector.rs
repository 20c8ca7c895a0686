// 该文件是 Rizhao （日照） 项目的一部分。
// src/detector.rs - 太阳能板检测适配器
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
  collections::{HashMap, hash_map::Entry},
  path::Path,
  time::Instant,
};

use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  frame::SourceFrame,
  input::{ImageFileInput, ImageFileInputError},
  model::{DetectItem, DetectResult, Labels, Model, ModelError, ModelWrapper},
  output::draw::Draw,
};

mod catalog;
mod detection;

pub use self::catalog::{DEFAULT_MODEL, ModelCatalog};
pub use self::detection::{BoundingBox, Detection, DetectionError};

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("图像输入错误: {0}")]
  InputError(#[from] ImageFileInputError),
  #[error("模型错误: {0}")]
  ModelError(#[from] ModelError),
  #[error("未知模型 '{name}', 可选: {available}")]
  UnknownModel { name: String, available: String },
}

/// 一次检测的产物：标注图像与检测表
#[derive(Debug, Clone)]
pub struct DetectionOutput {
  pub model: String,
  pub width: u32,
  pub height: u32,
  pub annotated: RgbImage,
  pub detections: Vec<Detection>,
}

impl DetectionOutput {
  /// 转回归一化坐标的检测结果，用于写检测记录
  pub fn to_detect_result(&self) -> DetectResult {
    self
      .detections
      .iter()
      .map(|det| DetectItem {
        label: det.label().to_string(),
        score: det.confidence(),
        bbox: det.bbox().to_normalized(self.width, self.height),
      })
      .collect::<Vec<_>>()
      .into()
  }
}

/// 检测适配器，持有模型目录和本次会话内已加载的模型
pub struct DetectorAdapter {
  catalog: ModelCatalog,
  labels: Labels,
  draw: Draw,
  models: HashMap<String, ModelWrapper>,
}

impl DetectorAdapter {
  pub fn new(catalog: ModelCatalog, labels: Labels, draw: Draw) -> Self {
    Self {
      catalog,
      labels,
      draw,
      models: HashMap::new(),
    }
  }

  fn model(&mut self, selector: &str) -> Result<&ModelWrapper, DetectorError> {
    match self.models.entry(selector.to_string()) {
      Entry::Occupied(entry) => Ok(entry.into_mut()),
      Entry::Vacant(entry) => {
        let url = self.catalog.get(selector)?;
        let model = ModelWrapper::load(url, &self.labels)?;
        Ok(entry.insert(model))
      }
    }
  }

  /// 对 image_path 指向的图像运行 selector 选中的模型
  pub fn detect(
    &mut self,
    image_path: &Path,
    selector: &str,
  ) -> Result<DetectionOutput, DetectorError> {
    let frame = ImageFileInput::new(image_path)?.read()?;
    self.detect_frame(frame, selector)
  }

  pub fn detect_frame(
    &mut self,
    frame: SourceFrame,
    selector: &str,
  ) -> Result<DetectionOutput, DetectorError> {
    let (width, height) = (frame.width(), frame.height());

    info!("开始推理，模型: {}", selector);
    let now = Instant::now();
    let result = self.model(selector)?.infer(&frame)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());

    let detections = to_detections(&result, width, height);
    info!("检测到 {} 个目标", detections.len());

    let mut annotated = frame.into_image();
    self.draw.draw_detections_on_image(&mut annotated, &detections);

    Ok(DetectionOutput {
      model: selector.to_string(),
      width,
      height,
      annotated,
      detections,
    })
  }
}

fn to_detections(result: &DetectResult, width: u32, height: u32) -> Vec<Detection> {
  result
    .items
    .iter()
    .filter_map(|item| {
      let detection = BoundingBox::from_normalized(item.bbox, width, height)
        .and_then(|bbox| Detection::new(item.label.clone(), item.score, bbox));
      match detection {
        Ok(detection) => Some(detection),
        Err(e) => {
          warn!("丢弃无效检测 {:?}: {}", item, e);
          None
        }
      }
    })
    .collect()
}
