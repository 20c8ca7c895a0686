// 该文件是 Rizhao （日照） 项目的一部分。
// src/estimate.rs - 面积与发电量估算
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

//! 纯计算，无 I/O。输入范围由调用方保证，这里不做截断，也不做舍入。

use serde::Serialize;
use thiserror::Error;

use crate::detector::Detection;

pub const DAYS_PER_YEAR: f64 = 365.0;

pub const DEFAULT_SCALE_M_PER_PX: f64 = 0.08;
pub const MIN_SCALE_M_PER_PX: f64 = 0.01;
pub const MAX_SCALE_M_PER_PX: f64 = 10.0;
pub const DEFAULT_EFFICIENCY_PERCENT: f64 = 18.5;
pub const DEFAULT_SYSTEM_LOSS_PERCENT: f64 = 10.0;

#[derive(Error, Debug, PartialEq)]
pub enum EstimateError {
  #[error("像素比例必须为正数: {0}")]
  InvalidScale(f64),
  #[error("组件效率必须在 (0, 100] % 之间: {0}")]
  InvalidEfficiency(f64),
  #[error("系统损耗必须在 [0, 100) % 之间: {0}")]
  InvalidSystemLoss(f64),
}

/// 单个检测目标的面积
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelArea {
  #[serde(flatten)]
  pub detection: Detection,
  pub area_px: f64,
  pub area_m2: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AreaSummary {
  pub items: Vec<PanelArea>,
  pub total_area_px: f64,
  pub total_area_m2: f64,
}

/// 按 m/px 比例把检测框换算为实际面积；无检测时合计为 0
pub fn compute_areas(
  detections: &[Detection],
  scale_m_per_px: f64,
) -> Result<AreaSummary, EstimateError> {
  if !(scale_m_per_px.is_finite() && scale_m_per_px > 0.0) {
    return Err(EstimateError::InvalidScale(scale_m_per_px));
  }

  let scale_sq = scale_m_per_px * scale_m_per_px;
  let items: Vec<PanelArea> = detections
    .iter()
    .map(|detection| {
      let area_px = detection.area_px();
      PanelArea {
        detection: detection.clone(),
        area_px,
        area_m2: area_px * scale_sq,
      }
    })
    .collect();

  let total_area_px = items.iter().map(|item| item.area_px).sum();
  let total_area_m2 = items.iter().map(|item| item.area_m2).sum();

  Ok(AreaSummary {
    items,
    total_area_px,
    total_area_m2,
  })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyEstimate {
  pub daily_kwh: f64,
  pub yearly_kwh: f64,
}

/// daily = 面积 · 辐照度 · 效率 · (1 - 损耗)，yearly = daily · 365
pub fn estimate_energy(
  total_area_m2: f64,
  irradiance_kwh_per_m2_day: f64,
  panel_efficiency: f64,
  system_loss: f64,
) -> EnergyEstimate {
  let daily_kwh =
    total_area_m2 * irradiance_kwh_per_m2_day * panel_efficiency * (1.0 - system_loss);
  EnergyEstimate {
    daily_kwh,
    yearly_kwh: daily_kwh * DAYS_PER_YEAR,
  }
}

/// 组件效率与系统损耗，均为比例值
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyParameters {
  pub panel_efficiency: f64,
  pub system_loss: f64,
}

impl Default for EnergyParameters {
  fn default() -> Self {
    Self {
      panel_efficiency: DEFAULT_EFFICIENCY_PERCENT / 100.0,
      system_loss: DEFAULT_SYSTEM_LOSS_PERCENT / 100.0,
    }
  }
}

impl EnergyParameters {
  /// 由百分数构造，效率 ∈ (0, 100]，损耗 ∈ [0, 100)
  pub fn from_percent(efficiency_percent: f64, system_loss_percent: f64) -> Result<Self, EstimateError> {
    if !(efficiency_percent > 0.0 && efficiency_percent <= 100.0) {
      return Err(EstimateError::InvalidEfficiency(efficiency_percent));
    }
    if !(0.0..100.0).contains(&system_loss_percent) {
      return Err(EstimateError::InvalidSystemLoss(system_loss_percent));
    }

    Ok(Self {
      panel_efficiency: efficiency_percent / 100.0,
      system_loss: system_loss_percent / 100.0,
    })
  }

  pub fn estimate(&self, total_area_m2: f64, irradiance_kwh_per_m2_day: f64) -> EnergyEstimate {
    estimate_energy(
      total_area_m2,
      irradiance_kwh_per_m2_day,
      self.panel_efficiency,
      self.system_loss,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detector::BoundingBox;

  const EPS: f64 = 1e-9;

  fn panel(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Detection {
    Detection::new(
      "solar_panel",
      0.8,
      BoundingBox::new(xmin, ymin, xmax, ymax).unwrap(),
    )
    .unwrap()
  }

  #[test]
  fn per_detection_areas_follow_box_size_and_scale() {
    let detections = [panel(10.0, 10.0, 60.0, 30.0), panel(0.0, 0.0, 3.5, 2.0)];
    let summary = compute_areas(&detections, 0.08).unwrap();

    assert_eq!(summary.items[0].area_px, 50.0 * 20.0);
    assert_eq!(summary.items[0].area_m2, 1000.0 * (0.08 * 0.08));
    assert_eq!(summary.items[1].area_px, 7.0);
    assert_eq!(summary.items[1].area_m2, 7.0 * (0.08 * 0.08));
  }

  #[test]
  fn totals_are_sums_of_items() {
    let detections = [
      panel(0.0, 0.0, 10.0, 10.0),
      panel(5.0, 5.0, 25.0, 15.0),
      panel(100.0, 40.0, 130.5, 41.0),
    ];
    let summary = compute_areas(&detections, 0.3).unwrap();

    let px: f64 = summary.items.iter().map(|i| i.area_px).sum();
    let m2: f64 = summary.items.iter().map(|i| i.area_m2).sum();
    assert_eq!(summary.total_area_px, px);
    assert_eq!(summary.total_area_m2, m2);
    assert_eq!(summary.total_area_px, 100.0 + 200.0 + 30.5);
  }

  #[test]
  fn empty_detections_give_zero_totals() {
    let summary = compute_areas(&[], 0.08).unwrap();
    assert!(summary.items.is_empty());
    assert_eq!(summary.total_area_px, 0.0);
    assert_eq!(summary.total_area_m2, 0.0);
  }

  #[test]
  fn rejects_non_positive_scale() {
    let detections = [panel(0.0, 0.0, 1.0, 1.0)];
    assert_eq!(
      compute_areas(&detections, 0.0),
      Err(EstimateError::InvalidScale(0.0))
    );
    assert!(compute_areas(&detections, -0.5).is_err());
    assert!(compute_areas(&detections, f64::NAN).is_err());
  }

  #[test]
  fn reference_scenario() {
    let energy = estimate_energy(100.0, 5.5, 0.185, 0.10);
    assert!((energy.daily_kwh - 91.575).abs() < EPS);
    assert!((energy.yearly_kwh - 33_424.875).abs() < 1e-6);
  }

  #[test]
  fn zero_area_gives_zero_energy() {
    let energy = estimate_energy(0.0, 5.5, 0.185, 0.10);
    assert_eq!(energy.daily_kwh, 0.0);
    assert_eq!(energy.yearly_kwh, 0.0);
  }

  #[test]
  fn energy_is_monotonic_in_each_input() {
    let steps = [0.0, 0.05, 0.1, 0.25, 0.5, 0.75, 0.99];
    let base = estimate_energy(50.0, 4.0, 0.2, 0.1).daily_kwh;

    let mut last = f64::MIN;
    for s in steps {
      let e = estimate_energy(s * 200.0, 4.0, 0.2, 0.1).daily_kwh;
      assert!(e >= last);
      last = e;
    }

    let mut last = f64::MIN;
    for s in steps {
      let e = estimate_energy(50.0, s * 8.0, 0.2, 0.1).daily_kwh;
      assert!(e >= last);
      last = e;
    }

    let mut last = f64::MIN;
    for s in steps {
      let e = estimate_energy(50.0, 4.0, s.max(0.01), 0.1).daily_kwh;
      assert!(e >= last);
      last = e;
    }

    let mut last = f64::MAX;
    for s in steps {
      let e = estimate_energy(50.0, 4.0, 0.2, s).daily_kwh;
      assert!(e <= last);
      last = e;
    }

    assert!(base > 0.0);
  }

  #[test]
  fn repeated_calls_are_bit_identical() {
    let detections = [panel(1.0, 2.0, 33.3, 44.4), panel(7.0, 7.0, 9.0, 19.0)];
    let a = compute_areas(&detections, 0.123).unwrap();
    let b = compute_areas(&detections, 0.123).unwrap();
    assert_eq!(a.total_area_m2.to_bits(), b.total_area_m2.to_bits());

    let e1 = estimate_energy(a.total_area_m2, 5.1, 0.19, 0.07);
    let e2 = estimate_energy(b.total_area_m2, 5.1, 0.19, 0.07);
    assert_eq!(e1.daily_kwh.to_bits(), e2.daily_kwh.to_bits());
    assert_eq!(e1.yearly_kwh.to_bits(), e2.yearly_kwh.to_bits());
  }

  #[test]
  fn parameters_from_percent() {
    let params = EnergyParameters::from_percent(18.5, 10.0).unwrap();
    assert!((params.panel_efficiency - 0.185).abs() < EPS);
    assert!((params.system_loss - 0.10).abs() < EPS);
    assert_eq!(params, EnergyParameters::default());

    assert!(EnergyParameters::from_percent(0.0, 10.0).is_err());
    assert!(EnergyParameters::from_percent(101.0, 10.0).is_err());
    assert!(EnergyParameters::from_percent(18.5, 100.0).is_err());
    assert!(EnergyParameters::from_percent(18.5, -1.0).is_err());
  }
}
