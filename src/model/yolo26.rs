// 该文件是 Rizhao （日照） 项目的一部分。
// src/model/yolo26.rs - YOLO26 太阳能板检测模型
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

use rknpu::{Context, InitFlags, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  path_from_url,
  frame::{RgbNhwcFrame, SourceFrame},
  input::AsNhwcFrame,
  model::{DetectItem, DetectResult, Labels, Model, YOLO26_SCHEME},
};

const YOLO26_NUM_INPUTS: u32 = 1;
const YOLO26_NUM_OUTPUTS: u32 = 6;
const YOLO26_INPUT_W: u32 = 640;
const YOLO26_INPUT_H: u32 = 640;
const YOLO26_HEAD_SIZES: [(usize, usize); 3] = [(80, 80), (40, 40), (20, 20)];
const YOLO26_STRIDES: [f32; 3] = [8.0, 16.0, 32.0];
const YOLO26_OBJECT_THRESH: f32 = 0.5;

type Yolo26Frame = RgbNhwcFrame<{ YOLO26_INPUT_W }, { YOLO26_INPUT_H }>;

pub struct Yolo26 {
  context: Context,
  labels: Labels,
}

#[derive(Error, Debug)]
pub enum Yolo26Error {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("RKNN 错误: {0}")]
  RknnError(#[from] rknpu::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("类别表为空")]
  EmptyLabels,
}

impl Yolo26Error {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    Yolo26Error::ModelInvalid(msg.to_string(), e)
  }
}

pub struct Yolo26Builder {
  model_path: PathBuf,
  flags: InitFlags,
  labels: Labels,
}

impl FromUrlWithScheme for Yolo26Builder {
  const SCHEME: &'static str = YOLO26_SCHEME;
}

impl FromUrl for Yolo26Builder {
  type Error = Yolo26Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(Yolo26Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(Yolo26Builder {
      model_path: path_from_url(url)
        .map_err(|e| Yolo26Error::ModelPathError(format!("无法解码模型路径: {}", e)))?,
      flags: InitFlags::default(),
      labels: Labels::default(),
    })
  }
}

impl Yolo26Builder {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn labels(mut self, labels: Labels) -> Self {
    self.labels = labels;
    self
  }

  pub fn build(self) -> Result<Yolo26, Yolo26Error> {
    if self.labels.is_empty() {
      return Err(Yolo26Error::EmptyLabels);
    }

    info!("加载模型文件: {}", self.model_path.display());
    let mode_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      mode_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context = Context::new(&mode_data, self.flags)?;

    match context.sdk_version() {
      Ok(version) => {
        if let Ok(api_ver) = version.api_version() {
          debug!("模型 API 版本: {}", api_ver);
        }
        if let Ok(drv_ver) = version.driver_version() {
          debug!("模型驱动版本: {}", drv_ver);
        }
      }
      Err(e) => {
        error!("查询 SDK 版本失败: {}", e);
        return Err(Yolo26Error::invalid("无法查询 SDK 版本", e));
      }
    }

    let num_inputs = context
      .num_inputs()
      .map_err(|e| Yolo26Error::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| Yolo26Error::invalid("无法获取输出数量", e))?;

    if num_inputs != YOLO26_NUM_INPUTS || num_outputs != YOLO26_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        YOLO26_NUM_INPUTS, YOLO26_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(Yolo26Error::invalid(&msg, rknpu::Error::InvalidModel));
    }

    info!("模型加载完成，类别数: {}", self.labels.len());
    Ok(Yolo26 {
      context,
      labels: self.labels,
    })
  }
}

/// 根据张量大小匹配回归和分类输出
/// 返回 (reg, cls) 元组，如果大小不匹配则返回 None
fn match_reg_cls_tensors<'a>(
  tensor1: &'a [f32],
  tensor2: &'a [f32],
  reg_expected: usize,
  cls_expected: usize,
  head_idx: usize,
) -> Option<(&'a [f32], &'a [f32])> {
  if tensor1.len() == reg_expected && tensor2.len() == cls_expected {
    Some((tensor1, tensor2))
  } else if tensor1.len() == cls_expected && tensor2.len() == reg_expected {
    debug!("检测头 {}: 输出顺序交换", head_idx);
    Some((tensor2, tensor1))
  } else {
    error!(
      "检测头 {}: 输出大小不匹配 - 张量1: {}, 张量2: {}, 期望回归: {}, 期望分类: {}",
      head_idx,
      tensor1.len(),
      tensor2.len(),
      reg_expected,
      cls_expected
    );
    None
  }
}

impl Model for Yolo26 {
  type Input = SourceFrame;
  type Output = DetectResult;
  type Error = Yolo26Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    // 整图缩放到 640x640，归一化坐标可直接映射回原图
    let frame = Yolo26Frame::from(input);

    debug!("设置模型输入");
    self.context.set_input(
      0,
      frame.as_nhwc(),
      rknpu::TensorFormat::NHWC,
      TensorType::UInt8,
    )?;

    debug!("执行模型推理");
    self.context.run()?;

    let output = self.context.get_outputs()?;
    Ok(self.postprocess(output))
  }
}

impl Yolo26 {
  fn postprocess(&self, output: rknpu::Output) -> DetectResult {
    let class_num = self.labels.len();
    let input_w = YOLO26_INPUT_W as f32;
    let input_h = YOLO26_INPUT_H as f32;
    let mut items = Vec::new();

    for (head_idx, (&(map_h, map_w), stride)) in
      YOLO26_HEAD_SIZES.iter().zip(YOLO26_STRIDES).enumerate()
    {
      let spatial = map_h * map_w;
      let reg_expected = 4 * spatial;
      let cls_expected = class_num * spatial;

      // RKNN 输出顺序不固定，按张量大小区分回归与分类
      let output_idx1 = head_idx * 2;
      let output_idx2 = head_idx * 2 + 1;

      let tensor1 = match output.get_f32(output_idx1) {
        Ok(data) => data,
        Err(e) => {
          error!("获取第 {} 个输出失败: {}", output_idx1, e);
          continue;
        }
      };

      let tensor2 = match output.get_f32(output_idx2) {
        Ok(data) => data,
        Err(e) => {
          error!("获取第 {} 个输出失败: {}", output_idx2, e);
          continue;
        }
      };

      let Some((reg, cls)) =
        match_reg_cls_tensors(tensor1, tensor2, reg_expected, cls_expected, head_idx)
      else {
        continue;
      };

      for h in 0..map_h {
        for w in 0..map_w {
          let idx = h * map_w + w;

          let (score, class_id) = {
            let mut max_logit = f32::MIN;
            let mut cls_idx = 0usize;
            for c in 0..class_num {
              let logit = cls[c * spatial + idx];
              if logit > max_logit {
                max_logit = logit;
                cls_idx = c;
              }
            }
            (sigmoid(max_logit), cls_idx as u32)
          };

          if score <= YOLO26_OBJECT_THRESH {
            continue;
          }

          let cx = reg[idx];
          let cy = reg[spatial + idx];
          let cw = reg[2 * spatial + idx];
          let ch = reg[3 * spatial + idx];

          let grid_x = (w as f32) + 0.5;
          let grid_y = (h as f32) + 0.5;

          let xmin = ((grid_x - cx) * stride).clamp(0.0, input_w);
          let ymin = ((grid_y - cy) * stride).clamp(0.0, input_h);
          let xmax = ((grid_x + cw) * stride).clamp(0.0, input_w);
          let ymax = ((grid_y + ch) * stride).clamp(0.0, input_h);

          items.push(DetectItem {
            label: self.labels.label_of(class_id),
            score,
            bbox: [
              xmin / input_w,
              ymin / input_h,
              xmax / input_w,
              ymax / input_h,
            ],
          });
        }
      }
    }

    debug!("检测到 {} 个物体", items.len());
    DetectResult::from(items)
  }
}

fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}
