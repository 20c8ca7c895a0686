// 该文件是 Rizhao （日照） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;

use crate::estimate::{MAX_SCALE_M_PER_PX, MIN_SCALE_M_PER_PX};

/// Rizhao 太阳能板检测与发电量估算
///
/// 未给出的选项依次取配置文件中的值和内置默认值。
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 待分析的航拍/卫星图像 (jpg, jpeg, png, tif, tiff)
  #[arg(value_name = "IMAGE")]
  pub image: PathBuf,

  /// TOML 配置文件
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// 检测模型名称 (Model1, Model2, Model3 或配置文件中的自定义名称)
  #[arg(long, value_name = "NAME")]
  pub model: Option<String>,

  /// 模型类别名称，按类别编号排列
  #[arg(long, value_name = "LABEL", value_delimiter = ',')]
  pub labels: Option<Vec<String>>,

  /// 标签字体 (TTF)，未指定时只绘制边框
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 纬度 (-90.0 - 90.0)
  #[arg(long, value_parser = parse_latitude, allow_hyphen_values = true)]
  pub latitude: Option<f64>,

  /// 经度 (-180.0 - 180.0)
  #[arg(long, value_parser = parse_longitude, allow_hyphen_values = true)]
  pub longitude: Option<f64>,

  /// 组件效率，百分数 (0 - 100]
  #[arg(long, value_name = "PERCENT", value_parser = parse_efficiency)]
  pub efficiency: Option<f64>,

  /// 系统损耗，百分数 [0 - 100)
  #[arg(long, value_name = "PERCENT", value_parser = parse_system_loss)]
  pub system_loss: Option<f64>,

  /// 像素比例，米/像素 (0.01 - 10.0)
  #[arg(long, value_name = "M_PER_PX", value_parser = parse_scale)]
  pub scale: Option<f64>,

  /// 手动辐照度 (kWh/m²/day)，仅在 PVGIS 查询失败时使用
  #[arg(long, value_name = "KWH", value_parser = parse_irradiance)]
  pub irradiance: Option<f64>,

  /// PVGIS 查询失败后的重试次数
  #[arg(long, value_name = "COUNT")]
  pub irradiance_retries: Option<u32>,

  /// PVGIS PVcalc 接口地址
  #[arg(long, value_name = "URL")]
  pub pvgis_url: Option<String>,

  /// PVGIS 请求超时（秒）
  #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
  pub timeout_secs: Option<u64>,

  /// 标注图像输出路径
  #[arg(long, value_name = "FILE")]
  pub output: Option<PathBuf>,

  /// JSON 报告输出路径
  #[arg(long, value_name = "FILE")]
  pub report: Option<PathBuf>,

  /// 检测记录输出路径，可作为 record:// 模型回放
  #[arg(long, value_name = "FILE")]
  pub record: Option<PathBuf>,
}

pub fn parse_bounded_float(s: &str, min: f64, max: f64, name: &str) -> Result<f64, String> {
  let value: f64 = s
    .parse()
    .map_err(|_| format!("'{s}' 不是有效的数字"))?;

  if !(min..=max).contains(&value) {
    return Err(format!("{name} 必须在 {min} 与 {max} 之间, 实际为 {value}"));
  }

  Ok(value)
}

pub fn parse_latitude(s: &str) -> Result<f64, String> {
  parse_bounded_float(s, -90.0, 90.0, "纬度")
}

pub fn parse_longitude(s: &str) -> Result<f64, String> {
  parse_bounded_float(s, -180.0, 180.0, "经度")
}

pub fn parse_scale(s: &str) -> Result<f64, String> {
  parse_bounded_float(s, MIN_SCALE_M_PER_PX, MAX_SCALE_M_PER_PX, "像素比例")
}

pub fn parse_efficiency(s: &str) -> Result<f64, String> {
  let value = parse_bounded_float(s, 0.0, 100.0, "组件效率")?;
  if value == 0.0 {
    return Err("组件效率必须大于 0".to_string());
  }
  Ok(value)
}

pub fn parse_system_loss(s: &str) -> Result<f64, String> {
  let value = parse_bounded_float(s, 0.0, 100.0, "系统损耗")?;
  if value == 100.0 {
    return Err("系统损耗必须小于 100".to_string());
  }
  Ok(value)
}

pub fn parse_irradiance(s: &str) -> Result<f64, String> {
  let value: f64 = s
    .parse()
    .map_err(|_| format!("'{s}' 不是有效的数字"))?;
  if !(value.is_finite() && value >= 0.0) {
    return Err(format!("辐照度不能为负数: {value}"));
  }
  Ok(value)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bounded_float_accepts_inclusive_range() {
    assert_eq!(parse_bounded_float("10", 0.0, 10.0, "x"), Ok(10.0));
    assert_eq!(parse_bounded_float("0", 0.0, 10.0, "x"), Ok(0.0));
    assert!(parse_bounded_float("10.01", 0.0, 10.0, "x").is_err());
    assert!(parse_bounded_float("abc", 0.0, 10.0, "x").is_err());
  }

  #[test]
  fn coordinates_are_range_checked() {
    assert_eq!(parse_latitude("-33.9"), Ok(-33.9));
    assert!(parse_latitude("90.5").is_err());
    assert_eq!(parse_longitude("-180"), Ok(-180.0));
    assert!(parse_longitude("181").is_err());
  }

  #[test]
  fn scale_bounds() {
    assert_eq!(parse_scale("0.01"), Ok(0.01));
    assert_eq!(parse_scale("10"), Ok(10.0));
    assert!(parse_scale("0.009").is_err());
    assert!(parse_scale("0").is_err());
  }

  #[test]
  fn efficiency_and_loss_are_half_open() {
    assert!(parse_efficiency("0").is_err());
    assert_eq!(parse_efficiency("100"), Ok(100.0));
    assert_eq!(parse_system_loss("0"), Ok(0.0));
    assert!(parse_system_loss("100").is_err());
  }

  #[test]
  fn negative_coordinates_parse_from_command_line() {
    let args = Args::try_parse_from([
      "rizhao",
      "--latitude",
      "-33.9",
      "--longitude",
      "-70.6",
      "roof.png",
    ])
    .unwrap();
    assert_eq!(args.latitude, Some(-33.9));
    assert_eq!(args.longitude, Some(-70.6));
    assert_eq!(args.image, PathBuf::from("roof.png"));
  }

  #[test]
  fn labels_are_comma_separated() {
    let args = Args::try_parse_from(["rizhao", "--labels", "panel,roof", "a.jpg"]).unwrap();
    assert_eq!(args.labels, Some(vec!["panel".to_string(), "roof".to_string()]));
  }
}
