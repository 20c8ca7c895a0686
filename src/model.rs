// 该文件是 Rizhao （日照） 项目的一部分。
// src/model.rs - 模型
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

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::SourceFrame};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub label: String,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，归一化坐标
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

pub const DEFAULT_LABEL: &str = "solar_panel";

/// 类别编号到名称的映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
  names: Box<[String]>,
}

impl Default for Labels {
  fn default() -> Self {
    Self::new(vec![DEFAULT_LABEL.to_string()])
  }
}

impl Labels {
  pub fn new(names: Vec<String>) -> Self {
    Self {
      names: names.into_boxed_slice(),
    }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn label_of(&self, id: u32) -> String {
    self
      .names
      .get(id as usize)
      .cloned()
      .unwrap_or_else(|| format!("class_{id}"))
  }
}

mod record;
pub use self::record::{RecordError, RecordModel, RecordModelBuilder, format_record_line, parse_record};

#[cfg(feature = "model_yolo26")]
mod yolo26;
#[cfg(feature = "model_yolo26")]
pub use self::yolo26::{Yolo26, Yolo26Builder, Yolo26Error};

pub const YOLO26_SCHEME: &str = "yolo26";

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("检测记录错误: {0}")]
  RecordError(#[from] RecordError),
  #[cfg(feature = "model_yolo26")]
  #[error("YOLO26 模型错误: {0}")]
  Yolo26Error(#[from] Yolo26Error),
  #[error("模型后端 '{0}' 未启用，请使用对应的 cargo feature 重新编译")]
  BackendDisabled(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 按 URL 方案选择的推理后端
pub enum ModelWrapper {
  #[cfg(feature = "model_yolo26")]
  Yolo26(Yolo26),
  Record(RecordModel),
}

impl ModelWrapper {
  pub fn load(url: &Url, labels: &Labels) -> Result<Self, ModelError> {
    info!("加载模型: {}", url);
    match url.scheme() {
      RecordModelBuilder::SCHEME => {
        let model = RecordModelBuilder::from_url(url)?.labels(labels.clone()).build()?;
        Ok(ModelWrapper::Record(model))
      }
      #[cfg(feature = "model_yolo26")]
      Yolo26Builder::SCHEME => {
        let model = Yolo26Builder::from_url(url)?.labels(labels.clone()).build()?;
        Ok(ModelWrapper::Yolo26(model))
      }
      #[cfg(not(feature = "model_yolo26"))]
      YOLO26_SCHEME => Err(ModelError::BackendDisabled(YOLO26_SCHEME.to_string())),
      other => Err(ModelError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Model for ModelWrapper {
  type Input = SourceFrame;
  type Output = DetectResult;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    match self {
      #[cfg(feature = "model_yolo26")]
      ModelWrapper::Yolo26(model) => model.infer(input).map_err(ModelError::from),
      ModelWrapper::Record(model) => model.infer(input).map_err(ModelError::from),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn label_lookup_falls_back_to_class_id() {
    let labels = Labels::new(vec!["solar_panel".into(), "solar_farm".into()]);
    assert_eq!(labels.label_of(1), "solar_farm");
    assert_eq!(labels.label_of(7), "class_7");
  }

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = Url::parse("onnx:models/best1.onnx").unwrap();
    let result = ModelWrapper::load(&url, &Labels::default());
    assert!(matches!(result, Err(ModelError::SchemeMismatch(s)) if s == "onnx"));
  }

  #[cfg(feature = "model_yolo26")]
  #[test]
  fn default_model_is_served_by_yolo26_backend() {
    use crate::detector::{DEFAULT_MODEL, ModelCatalog};

    let catalog = ModelCatalog::default();
    let url = catalog.get(DEFAULT_MODEL).unwrap();
    let result = ModelWrapper::load(url, &Labels::default());

    // 权重文件不随仓库发布，后端已启用时应失败在读取模型文件
    match result {
      Err(ModelError::Yolo26Error(Yolo26Error::ModelLoadError(e))) => {
        assert_eq!(e.kind(), std::io::ErrorKind::NotFound)
      }
      Err(e) => panic!("unexpected error: {e}"),
      Ok(_) => panic!("models/best3.rknn should not exist in the source tree"),
    }
  }

  #[cfg(not(feature = "model_yolo26"))]
  #[test]
  fn yolo26_without_feature_reports_disabled_backend() {
    let url = Url::parse("yolo26:models/best1.rknn").unwrap();
    let result = ModelWrapper::load(&url, &Labels::default());
    assert!(matches!(result, Err(ModelError::BackendDisabled(_))));
  }
}
