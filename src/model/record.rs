// 该文件是 Rizhao （日照） 项目的一部分。
// src/model/record.rs - 检测记录回放
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

//! 记录文件每行一个目标：`label, score, x_min, y_min, x_max, y_max`，
//! 坐标为归一化坐标。label 为整数时按类别编号查表。
//! 空行与 `#` 开头的行被忽略。

use std::{borrow::Cow, path::PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  path_from_url,
  frame::SourceFrame,
  model::{DetectItem, DetectResult, Labels, Model},
};

const RECORD_FIELDS: usize = 6;

#[derive(Error, Debug)]
pub enum RecordError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch { expected: String, actual: String },
  #[error("读取记录文件 {path} 失败: {source}")]
  IoError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("记录第 {line} 行格式错误: {message}")]
  ParseError { line: usize, message: String },
  #[error("记录文件路径无效: {0}")]
  InvalidPath(#[from] std::string::FromUtf8Error),
}

pub struct RecordModelBuilder {
  path: PathBuf,
  labels: Labels,
}

impl FromUrlWithScheme for RecordModelBuilder {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordModelBuilder {
  type Error = RecordError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RecordError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        actual: url.scheme().to_string(),
      });
    }

    Ok(RecordModelBuilder {
      path: path_from_url(url)?,
      labels: Labels::default(),
    })
  }
}

impl RecordModelBuilder {
  pub fn labels(mut self, labels: Labels) -> Self {
    self.labels = labels;
    self
  }

  pub fn build(self) -> Result<RecordModel, RecordError> {
    info!("加载检测记录: {}", self.path.display());
    let text = std::fs::read_to_string(&self.path).map_err(|source| RecordError::IoError {
      path: self.path.clone(),
      source,
    })?;
    let result = parse_record(&text, &self.labels)?;
    debug!("记录中共有 {} 个目标", result.len());

    Ok(RecordModel {
      path: self.path,
      result,
    })
  }
}

/// 回放预先记录的检测结果，不依赖推理硬件
#[derive(Debug, Clone)]
pub struct RecordModel {
  path: PathBuf,
  result: DetectResult,
}

impl Model for RecordModel {
  type Input = SourceFrame;
  type Output = DetectResult;
  type Error = RecordError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!(
      "回放 {} 的检测记录到图像 {}",
      self.path.display(),
      input.path().display()
    );
    Ok(self.result.clone())
  }
}

pub fn parse_record(text: &str, labels: &Labels) -> Result<DetectResult, RecordError> {
  let mut items = Vec::new();

  for (idx, raw) in text.lines().enumerate() {
    let line = idx + 1;
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
      continue;
    }

    let parse_error = |message: String| RecordError::ParseError { line, message };

    let (label, rest) = split_label(raw, labels).map_err(parse_error)?;
    let fields: Vec<&str> = match rest {
      Some(rest) => rest.split(',').map(str::trim).collect(),
      None => Vec::new(),
    };
    if fields.len() != RECORD_FIELDS - 1 {
      return Err(parse_error(format!(
        "期望 {} 个字段, 实际 {} 个",
        RECORD_FIELDS,
        fields.len() + 1
      )));
    }

    let mut numbers = [0f32; RECORD_FIELDS - 1];
    for (slot, field) in numbers.iter_mut().zip(&fields) {
      *slot = field
        .parse::<f32>()
        .map_err(|e| parse_error(format!("无法解析数值 '{}': {}", field, e)))?;
    }

    let [score, x_min, y_min, x_max, y_max] = numbers;
    items.push(DetectItem {
      label,
      score,
      bbox: [x_min, y_min, x_max, y_max],
    });
  }

  Ok(DetectResult::from(items))
}

// 拆出第一个字段。带双引号的标签按原文读取，其中 `""` 表示一个引号；
// 不带引号的整数标签按类别编号查表
fn split_label<'a>(raw: &'a str, labels: &Labels) -> Result<(String, Option<&'a str>), String> {
  let Some(quoted) = raw.strip_prefix('"') else {
    let (field, rest) = match raw.split_once(',') {
      Some((field, rest)) => (field.trim(), Some(rest)),
      None => (raw, None),
    };
    let label = match field.parse::<u32>() {
      Ok(id) => labels.label_of(id),
      Err(_) => field.to_string(),
    };
    return Ok((label, rest));
  };

  let mut label = String::new();
  let mut chars = quoted.char_indices().peekable();
  while let Some((idx, c)) = chars.next() {
    if c != '"' {
      label.push(c);
      continue;
    }
    if let Some((_, '"')) = chars.peek() {
      label.push('"');
      chars.next();
      continue;
    }

    let tail = quoted[idx + 1..].trim_start();
    return match tail.strip_prefix(',') {
      Some(rest) => Ok((label, Some(rest))),
      None if tail.is_empty() => Ok((label, None)),
      None => Err(format!("标签引号后存在多余内容: '{}'", tail)),
    };
  }

  Err("标签缺少右引号".to_string())
}

// 含分隔符、引号、首尾空白或以 `#` 开头的标签需加引号
fn quote_label(label: &str) -> Cow<'_, str> {
  if label.contains([',', '"']) || label.starts_with('#') || label.trim() != label {
    Cow::Owned(format!("\"{}\"", label.replace('"', "\"\"")))
  } else {
    Cow::Borrowed(label)
  }
}

pub fn format_record_line(item: &DetectItem) -> String {
  format!(
    "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
    quote_label(&item.label),
    item.score,
    item.bbox[0],
    item.bbox[1],
    item.bbox[2],
    item.bbox[3]
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;
  use std::io::Write;
  use tempfile::NamedTempFile;

  #[test]
  fn parses_named_and_numbered_labels() {
    let text = "# roof 12\nsolar_panel, 0.91, 0.1, 0.2, 0.3, 0.4\n\n0, 0.5, 0.0, 0.0, 0.5, 0.5\n";
    let result = parse_record(text, &Labels::default()).unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.items[0].label, "solar_panel");
    assert_eq!(result.items[0].bbox, [0.1, 0.2, 0.3, 0.4]);
    assert_eq!(result.items[1].label, "solar_panel");
    assert_eq!(result.items[1].score, 0.5);
  }

  #[test]
  fn empty_record_is_an_empty_result() {
    let result = parse_record("# nothing found\n", &Labels::default()).unwrap();
    assert!(result.is_empty());
  }

  #[test]
  fn reports_line_of_malformed_entry() {
    let text = "solar_panel, 0.9, 0.1, 0.2, 0.3, 0.4\nsolar_panel, 0.9, 0.1\n";
    let err = parse_record(text, &Labels::default()).unwrap_err();
    assert!(matches!(err, RecordError::ParseError { line: 2, .. }));
  }

  #[test]
  fn reports_non_numeric_field() {
    let err = parse_record("panel, high, 0, 0, 1, 1", &Labels::default()).unwrap_err();
    assert!(err.to_string().contains("high"));
  }

  #[test]
  fn formatted_line_parses_back() {
    let item = DetectItem {
      label: "solar_panel".into(),
      score: 0.75,
      bbox: [0.25, 0.5, 0.75, 1.0],
    };
    let parsed = parse_record(&format_record_line(&item), &Labels::default()).unwrap();
    assert_eq!(parsed.items[0], item);
  }

  #[test]
  fn model_replays_record_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "solar_panel, 0.8, 0.25, 0.25, 0.75, 0.75").unwrap();
    let url = Url::parse(&format!("record://{}", file.path().display())).unwrap();

    let model = RecordModelBuilder::from_url(&url).unwrap().build().unwrap();
    let frame = SourceFrame::new("roof.png", RgbImage::new(8, 8));
    let result = model.infer(&frame).unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.items[0].score, 0.8);
  }

  #[test]
  fn labels_with_separators_are_quoted() {
    for label in ["panel, mono", "say \"hi\"", "#roof", " padded "] {
      let item = DetectItem {
        label: label.into(),
        score: 0.5,
        bbox: [0.0, 0.0, 0.5, 0.5],
      };
      let line = format_record_line(&item);
      assert!(line.starts_with('"'), "{line}");
      let parsed = parse_record(&line, &Labels::default()).unwrap();
      assert_eq!(parsed.items[0], item);
    }
  }

  #[test]
  fn quoted_numeric_label_is_literal() {
    let parsed = parse_record("\"0\", 0.5, 0, 0, 1, 1", &Labels::default()).unwrap();
    assert_eq!(parsed.items[0].label, "0");
  }

  #[test]
  fn malformed_quoted_label_is_rejected() {
    let err = parse_record("\"panel, 0.5, 0, 0, 1, 1", &Labels::default()).unwrap_err();
    assert!(matches!(err, RecordError::ParseError { line: 1, .. }));
    let err = parse_record("\"panel\"x, 0.5, 0, 0, 1, 1", &Labels::default()).unwrap_err();
    assert!(matches!(err, RecordError::ParseError { line: 1, .. }));
  }

  #[test]
  fn relative_record_path_keeps_first_segment() {
    let url = Url::parse("record://records/roof.txt").unwrap();
    let builder = RecordModelBuilder::from_url(&url).unwrap();
    assert_eq!(builder.path, PathBuf::from("records/roof.txt"));
  }

  #[test]
  fn replays_record_from_directory_with_spaces() {
    let dir = tempfile::TempDir::new().unwrap();
    let nested = dir.path().join("my records/日照");
    std::fs::create_dir_all(&nested).unwrap();
    let path = nested.join("roof.txt");
    std::fs::write(&path, "solar_panel, 0.8, 0.25, 0.25, 0.75, 0.75\n").unwrap();

    let url = Url::parse(&format!("record://{}", path.display())).unwrap();
    let builder = RecordModelBuilder::from_url(&url).unwrap();
    assert_eq!(builder.path, path);
    assert_eq!(builder.build().unwrap().result.len(), 1);
  }

  #[test]
  fn rejects_other_scheme() {
    let url = Url::parse("yolo26:models/best1.rknn").unwrap();
    assert!(matches!(
      RecordModelBuilder::from_url(&url),
      Err(RecordError::SchemeMismatch { .. })
    ));
  }
}
