// 该文件是 Rizhao （日照） 项目的一部分。
// src/config.rs - 配置文件与参数合并
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

//! 配置优先级：命令行参数 > 配置文件 > 内置默认值。
//!
//! 配置文件示例：
//!
//! ```toml
//! model = "Model2"
//! labels = ["solar_panel"]
//!
//! [models]
//! Model2 = "yolo26:/opt/rizhao/best2.rknn"
//!
//! [location]
//! latitude = 36.45028
//! longitude = 10.73389
//!
//! [energy]
//! efficiency = 18.5
//! system_loss = 10.0
//! scale = 0.08
//! irradiance = 5.5
//!
//! [pvgis]
//! url = "https://re.jrc.ec.europa.eu/api/v5_2/PVcalc"
//! timeout_secs = 10
//! retries = 1
//! ```

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
  time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  args::Args,
  detector::{DEFAULT_MODEL, ModelCatalog},
  estimate::{
    DEFAULT_EFFICIENCY_PERCENT, DEFAULT_SCALE_M_PER_PX, DEFAULT_SYSTEM_LOSS_PERCENT,
    EnergyParameters, EstimateError, MAX_SCALE_M_PER_PX, MIN_SCALE_M_PER_PX,
  },
  irradiance::{DEFAULT_MANUAL_IRRADIANCE, DEFAULT_TIMEOUT, PVGIS_PVCALC_URL},
  model::Labels,
};

pub const DEFAULT_LATITUDE: f64 = 36.45028;
pub const DEFAULT_LONGITUDE: f64 = 10.73389;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("读取配置文件失败: {path}")]
  ConfigRead {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("解析配置文件失败: {path}")]
  ConfigParse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
  #[error("模型 '{name}' 的地址无效: {source}")]
  ModelUrl {
    name: String,
    #[source]
    source: url::ParseError,
  },
  #[error("{name} 必须在 {min} 与 {max} 之间, 实际为 {value}")]
  OutOfRange {
    name: &'static str,
    min: f64,
    max: f64,
    value: f64,
  },
  #[error("{0}")]
  Energy(#[from] EstimateError),
  #[error("类别表不能为空")]
  EmptyLabels,
  #[error("PVGIS 超时时间必须大于 0")]
  ZeroTimeout,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
  pub model: Option<String>,
  pub labels: Option<Vec<String>>,
  pub font: Option<PathBuf>,
  pub models: BTreeMap<String, String>,
  pub location: LocationSection,
  pub energy: EnergySection,
  pub pvgis: PvgisSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationSection {
  pub latitude: Option<f64>,
  pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnergySection {
  pub efficiency: Option<f64>,
  pub system_loss: Option<f64>,
  pub scale: Option<f64>,
  pub irradiance: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PvgisSection {
  pub url: Option<String>,
  pub timeout_secs: Option<u64>,
  pub retries: Option<u32>,
}

/// 读取 TOML 配置文件，显式指定的文件不存在时报错
pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
  let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigRead {
    path: path.to_path_buf(),
    source: e,
  })?;

  toml::from_str(&contents).map_err(|e| ConfigError::ConfigParse {
    path: path.to_path_buf(),
    source: e,
  })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
  pub latitude: f64,
  pub longitude: f64,
}

impl Default for Location {
  fn default() -> Self {
    Self {
      latitude: DEFAULT_LATITUDE,
      longitude: DEFAULT_LONGITUDE,
    }
  }
}

/// 合并后的会话配置
#[derive(Debug, Clone)]
pub struct Settings {
  pub model: String,
  pub catalog: ModelCatalog,
  pub labels: Labels,
  pub font: Option<PathBuf>,
  pub location: Location,
  pub scale_m_per_px: f64,
  pub energy: EnergyParameters,
  pub manual_irradiance: f64,
  pub irradiance_retries: u32,
  pub pvgis_url: String,
  pub timeout: Duration,
  pub output: Option<PathBuf>,
  pub report: Option<PathBuf>,
  pub record: Option<PathBuf>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      model: DEFAULT_MODEL.to_string(),
      catalog: ModelCatalog::default(),
      labels: Labels::default(),
      font: None,
      location: Location::default(),
      scale_m_per_px: DEFAULT_SCALE_M_PER_PX,
      energy: EnergyParameters::default(),
      manual_irradiance: DEFAULT_MANUAL_IRRADIANCE,
      irradiance_retries: 0,
      pvgis_url: PVGIS_PVCALC_URL.to_string(),
      timeout: DEFAULT_TIMEOUT,
      output: None,
      report: None,
      record: None,
    }
  }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<f64, ConfigError> {
  if (min..=max).contains(&value) {
    Ok(value)
  } else {
    Err(ConfigError::OutOfRange {
      name,
      min,
      max,
      value,
    })
  }
}

impl Settings {
  /// 读取 `--config` 指定的文件（若有）并与命令行参数合并
  pub fn load(args: &Args) -> Result<Self, ConfigError> {
    let file = match &args.config {
      Some(path) => {
        info!("加载配置文件: {}", path.display());
        load_config_file(path)?
      }
      None => ConfigFile::default(),
    };
    Self::resolve(args, file)
  }

  pub fn resolve(args: &Args, file: ConfigFile) -> Result<Self, ConfigError> {
    let mut catalog = ModelCatalog::default();
    for (name, url) in &file.models {
      let url = Url::parse(url).map_err(|source| ConfigError::ModelUrl {
        name: name.clone(),
        source,
      })?;
      debug!("配置模型 {} -> {}", name, url);
      catalog.insert(name.clone(), url);
    }

    let labels = args
      .labels
      .clone()
      .or(file.labels)
      .map(Labels::new)
      .unwrap_or_default();
    if labels.is_empty() {
      return Err(ConfigError::EmptyLabels);
    }

    let location = Location {
      latitude: check_range(
        "纬度",
        args
          .latitude
          .or(file.location.latitude)
          .unwrap_or(DEFAULT_LATITUDE),
        -90.0,
        90.0,
      )?,
      longitude: check_range(
        "经度",
        args
          .longitude
          .or(file.location.longitude)
          .unwrap_or(DEFAULT_LONGITUDE),
        -180.0,
        180.0,
      )?,
    };

    let scale_m_per_px = check_range(
      "像素比例",
      args
        .scale
        .or(file.energy.scale)
        .unwrap_or(DEFAULT_SCALE_M_PER_PX),
      MIN_SCALE_M_PER_PX,
      MAX_SCALE_M_PER_PX,
    )?;

    let energy = EnergyParameters::from_percent(
      args
        .efficiency
        .or(file.energy.efficiency)
        .unwrap_or(DEFAULT_EFFICIENCY_PERCENT),
      args
        .system_loss
        .or(file.energy.system_loss)
        .unwrap_or(DEFAULT_SYSTEM_LOSS_PERCENT),
    )?;

    let manual_irradiance = check_range(
      "手动辐照度",
      args
        .irradiance
        .or(file.energy.irradiance)
        .unwrap_or(DEFAULT_MANUAL_IRRADIANCE),
      0.0,
      f64::MAX,
    )?;

    let timeout = match args.timeout_secs.or(file.pvgis.timeout_secs) {
      Some(0) => return Err(ConfigError::ZeroTimeout),
      Some(secs) => Duration::from_secs(secs),
      None => DEFAULT_TIMEOUT,
    };

    Ok(Self {
      model: args
        .model
        .clone()
        .or(file.model)
        .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
      catalog,
      labels,
      font: args.font.clone().or(file.font),
      location,
      scale_m_per_px,
      energy,
      manual_irradiance,
      irradiance_retries: args
        .irradiance_retries
        .or(file.pvgis.retries)
        .unwrap_or(0),
      pvgis_url: args
        .pvgis_url
        .clone()
        .or(file.pvgis.url)
        .unwrap_or_else(|| PVGIS_PVCALC_URL.to_string()),
      timeout,
      output: args.output.clone(),
      report: args.report.clone(),
      record: args.record.clone(),
    })
  }
}
