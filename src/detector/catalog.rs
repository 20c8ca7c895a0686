// 该文件是 Rizhao （日照） 项目的一部分。
// src/detector/catalog.rs - 模型目录
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

use std::collections::BTreeMap;

use url::Url;

use crate::detector::DetectorError;

/// 默认选中的模型
pub const DEFAULT_MODEL: &str = "Model3";

const DEFAULT_MODELS: [(&str, &str); 3] = [
  ("Model1", "yolo26:models/best1.rknn"),
  ("Model2", "yolo26:models/best2.rknn"),
  ("Model3", "yolo26:models/best3.rknn"),
];

/// 模型名称到模型 URL 的固定映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
  entries: BTreeMap<String, Url>,
}

impl Default for ModelCatalog {
  fn default() -> Self {
    let entries = DEFAULT_MODELS
      .iter()
      .filter_map(|(name, url)| Url::parse(url).ok().map(|url| (name.to_string(), url)))
      .collect();
    Self { entries }
  }
}

impl From<BTreeMap<String, Url>> for ModelCatalog {
  fn from(entries: BTreeMap<String, Url>) -> Self {
    Self { entries }
  }
}

impl ModelCatalog {
  pub fn get(&self, name: &str) -> Result<&Url, DetectorError> {
    self
      .entries
      .get(name)
      .ok_or_else(|| DetectorError::UnknownModel {
        name: name.to_string(),
        available: self.names().join(", "),
      })
  }

  /// 添加或覆盖一个模型条目
  pub fn insert(&mut self, name: impl Into<String>, url: Url) -> Option<Url> {
    self.entries.insert(name.into(), url)
  }

  pub fn names(&self) -> Vec<&str> {
    self.entries.keys().map(String::as_str).collect()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
