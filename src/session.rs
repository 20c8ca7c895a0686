// 该文件是 Rizhao （日照） 项目的一部分。
// src/session.rs - 分析会话
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

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  config::{Location, Settings},
  detector::{DetectionOutput, DetectorAdapter, DetectorError},
  estimate::{AreaSummary, EnergyEstimate, EnergyParameters, EstimateError, compute_areas},
  input::{ImageFileInput, ImageFileInputError},
  irradiance::{Irradiance, IrradianceLookup, IrradianceProvider, ReqwestTransport, Transport},
};

#[derive(Error, Debug)]
pub enum SessionError {
  #[error("图像错误: {0}")]
  Image(#[from] ImageFileInputError),
  #[error("检测错误: {0}")]
  Detector(#[from] DetectorError),
  #[error("估算错误: {0}")]
  Estimate(#[from] EstimateError),
}

/// 辐照度回退到手动值时保留的诊断信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrradianceFallback {
  pub url: String,
  pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
  pub generated_at: DateTime<Utc>,
  pub image: PathBuf,
  pub model: String,
  pub width: u32,
  pub height: u32,
  pub location: Location,
  pub scale_m_per_px: f64,
  pub parameters: EnergyParameters,
  pub irradiance: Irradiance,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub irradiance_fallback: Option<IrradianceFallback>,
  pub areas: AreaSummary,
  pub energy: EnergyEstimate,
}

pub struct SessionOutcome {
  pub report: SessionReport,
  pub detection: DetectionOutput,
}

/// 一次用户会话：持有配置、辐照度查询与检测适配器
pub struct Session<T = ReqwestTransport> {
  settings: Settings,
  provider: IrradianceProvider<T>,
  detector: DetectorAdapter,
  lookup: Option<IrradianceLookup>,
}

impl<T: Transport> Session<T> {
  pub fn new(settings: Settings, provider: IrradianceProvider<T>, detector: DetectorAdapter) -> Self {
    Self {
      settings,
      provider,
      detector,
      lookup: None,
    }
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn last_lookup(&self) -> Option<&IrradianceLookup> {
    self.lookup.as_ref()
  }

  /// 重新查询一次 PVGIS，替换上一次的结果
  pub fn refresh_irradiance(&mut self) -> &IrradianceLookup {
    let Location {
      latitude,
      longitude,
    } = self.settings.location;
    self
      .lookup
      .insert(self.provider.fetch_irradiance(latitude, longitude))
  }

  /// 查询失败时最多再重试 retries 次，返回最终是否成功
  pub fn refresh_irradiance_with_retries(&mut self, retries: u32) -> bool {
    let mut ok = self.refresh_irradiance().is_ok();
    for attempt in 1..=retries {
      if ok {
        break;
      }
      info!("重试 PVGIS 查询 ({}/{})", attempt, retries);
      ok = self.refresh_irradiance().is_ok();
    }
    ok
  }

  /// 当前生效的辐照度，尚未查询时按配置的重试次数查询
  pub fn irradiance(&mut self) -> Irradiance {
    if self.lookup.is_none() {
      self.refresh_irradiance_with_retries(self.settings.irradiance_retries);
    }
    let manual = self.settings.manual_irradiance;
    match &self.lookup {
      Some(lookup) => {
        let irradiance = lookup.resolve(manual);
        if let Some(error) = lookup.error() {
          warn!(
            "使用手动辐照度 {:.2} kWh/m²/day, 可手动访问: {} ({})",
            manual,
            lookup.url(),
            error
          );
        }
        irradiance
      }
      None => Irradiance::manual(manual),
    }
  }

  fn fallback(&self) -> Option<IrradianceFallback> {
    let lookup = self.lookup.as_ref()?;
    lookup.error().map(|error| IrradianceFallback {
      url: lookup.url().to_string(),
      error,
    })
  }

  /// 检测 image_path 中的太阳能板并估算面积与发电量
  pub fn analyze(&mut self, image_path: &Path) -> Result<SessionOutcome, SessionError> {
    // 检测之前先确认图像存在且格式受支持
    let frame = ImageFileInput::new(image_path)?.read()?;
    info!("图像尺寸: {} x {}", frame.width(), frame.height());

    let detection = self.detector.detect_frame(frame, &self.settings.model)?;
    if detection.detections.is_empty() {
      warn!("未检测到太阳能板: {}", image_path.display());
    }

    let areas = compute_areas(&detection.detections, self.settings.scale_m_per_px)?;
    let irradiance = self.irradiance();
    let energy = self
      .settings
      .energy
      .estimate(areas.total_area_m2, irradiance.kwh_per_m2_day);
    info!(
      "总面积 {:.2} m², 预计日发电量 {:.2} kWh",
      areas.total_area_m2, energy.daily_kwh
    );

    let report = SessionReport {
      generated_at: Utc::now(),
      image: image_path.to_path_buf(),
      model: detection.model.clone(),
      width: detection.width,
      height: detection.height,
      location: self.settings.location,
      scale_m_per_px: self.settings.scale_m_per_px,
      parameters: self.settings.energy,
      irradiance_fallback: self.fallback(),
      irradiance,
      areas,
      energy,
    };

    Ok(SessionOutcome { report, detection })
  }
}
