// 该文件是 Rizhao （日照） 项目的一部分。
// src/irradiance.rs - PVGIS 辐照度查询
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

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::estimate::DAYS_PER_YEAR;

pub const PVGIS_PVCALC_URL: &str = "https://re.jrc.ec.europa.eu/api/v5_2/PVcalc";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MANUAL_IRRADIANCE: f64 = 5.5;

// 以 1 kWp、14% 损耗的名义系统估算年发电量
const NOMINAL_PEAK_POWER_KW: u32 = 1;
const NOMINAL_LOSS_PERCENT: u32 = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
  pub status: u16,
  pub body: String,
}

#[derive(Error, Debug)]
pub enum TransportError {
  #[error("{0}")]
  Http(#[from] reqwest::Error),
  #[error("{0}")]
  Other(String),
}

/// 发出一次 GET 请求
pub trait Transport {
  fn get(&self, url: &Url) -> Result<HttpResponse, TransportError>;
}

pub struct ReqwestTransport {
  client: reqwest::blocking::Client,
}

impl ReqwestTransport {
  pub fn new(timeout: Duration) -> Result<Self, TransportError> {
    let client = reqwest::blocking::Client::builder()
      .timeout(timeout)
      .build()?;
    Ok(Self { client })
  }
}

impl Transport for ReqwestTransport {
  fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
    let response = self.client.get(url.clone()).send()?;
    let status = response.status().as_u16();
    let body = response.text()?;
    Ok(HttpResponse { status, body })
  }
}

#[derive(Error, Debug)]
pub enum IrradianceError {
  #[error("PVGIS 返回状态码 {0}")]
  Status(u16),
  #[error("获取辐照度失败: {0}")]
  Transport(#[from] TransportError),
  #[error("获取辐照度失败: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("获取辐照度失败: 无效的 PVGIS 地址: {0}")]
  Endpoint(#[from] url::ParseError),
}

#[derive(Deserialize)]
struct PvcalcResponse {
  outputs: PvcalcOutputs,
}

#[derive(Deserialize)]
struct PvcalcOutputs {
  totals: PvcalcTotals,
}

#[derive(Deserialize)]
struct PvcalcTotals {
  fixed: PvcalcFixed,
}

#[derive(Deserialize)]
struct PvcalcFixed {
  #[serde(rename = "E_y")]
  e_y: f64,
}

/// 一次查询的结果：总是带有请求地址，值与错误二者有其一
#[derive(Debug)]
pub struct IrradianceLookup {
  url: String,
  outcome: Result<f64, IrradianceError>,
}

impl IrradianceLookup {
  pub fn url(&self) -> &str {
    &self.url
  }

  /// kWh/m²/day
  pub fn value(&self) -> Option<f64> {
    self.outcome.as_ref().ok().copied()
  }

  pub fn error(&self) -> Option<String> {
    self.outcome.as_ref().err().map(ToString::to_string)
  }

  pub fn is_ok(&self) -> bool {
    self.outcome.is_ok()
  }

  pub fn into_parts(self) -> (Option<f64>, String, Option<String>) {
    let error = self.error();
    (self.outcome.ok(), self.url, error)
  }

  /// 查询失败时回退到手动输入的值
  pub fn resolve(&self, manual_kwh_per_m2_day: f64) -> Irradiance {
    match self.value() {
      Some(value) => Irradiance {
        kwh_per_m2_day: value,
        provenance: Provenance::Fetched {
          url: self.url.clone(),
        },
      },
      None => Irradiance::manual(manual_kwh_per_m2_day),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
  Fetched { url: String },
  Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Irradiance {
  pub kwh_per_m2_day: f64,
  pub provenance: Provenance,
}

impl Irradiance {
  pub fn manual(kwh_per_m2_day: f64) -> Self {
    Self {
      kwh_per_m2_day,
      provenance: Provenance::Manual,
    }
  }

  pub fn is_fetched(&self) -> bool {
    matches!(self.provenance, Provenance::Fetched { .. })
  }
}

pub struct IrradianceProvider<T = ReqwestTransport> {
  endpoint: String,
  transport: T,
}

impl<T: Transport> IrradianceProvider<T> {
  pub fn new(endpoint: impl Into<String>, transport: T) -> Self {
    Self {
      endpoint: endpoint.into(),
      transport,
    }
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  fn request_url(&self, latitude: f64, longitude: f64) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
      &self.endpoint,
      &[
        ("lat", latitude.to_string()),
        ("lon", longitude.to_string()),
        ("outputformat", "json".to_string()),
        ("peakpower", NOMINAL_PEAK_POWER_KW.to_string()),
        ("loss", NOMINAL_LOSS_PERCENT.to_string()),
      ],
    )
  }

  // 地址无法解析时仍给出可手动访问的字符串
  fn fallback_url(&self, latitude: f64, longitude: f64) -> String {
    format!(
      "{}?lat={}&lon={}&outputformat=json&peakpower={}&loss={}",
      self.endpoint, latitude, longitude, NOMINAL_PEAK_POWER_KW, NOMINAL_LOSS_PERCENT
    )
  }

  /// 查询 (latitude, longitude) 处的日均辐照度，不做坐标范围检查，不重试
  pub fn fetch_irradiance(&self, latitude: f64, longitude: f64) -> IrradianceLookup {
    let url = match self.request_url(latitude, longitude) {
      Ok(url) => url,
      Err(e) => {
        warn!("PVGIS 地址无效: {}", e);
        return IrradianceLookup {
          url: self.fallback_url(latitude, longitude),
          outcome: Err(e.into()),
        };
      }
    };

    info!("查询 PVGIS 辐照度: {}", url);
    let outcome = self.request(&url);
    match &outcome {
      Ok(value) => info!("日均辐照度: {:.2} kWh/m²/day", value),
      Err(e) => warn!("辐照度查询失败: {}", e),
    }

    IrradianceLookup {
      url: url.into(),
      outcome,
    }
  }

  fn request(&self, url: &Url) -> Result<f64, IrradianceError> {
    let response = self.transport.get(url)?;
    if response.status != 200 {
      return Err(IrradianceError::Status(response.status));
    }

    let data: PvcalcResponse = serde_json::from_str(&response.body)?;
    let yearly = data.outputs.totals.fixed.e_y;
    debug!("PVGIS 年发电量 E_y = {}", yearly);
    Ok(yearly / DAYS_PER_YEAR)
  }
}
