//! Photovoltaic performance arithmetic.
//!
//! Pure functions over plain numbers. Nothing here fails: inputs that make a
//! metric meaningless produce `None` instead of a number.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Default derate applied by [`estimate_daily_energy`] (inverter, wiring, soiling losses).
pub const DEFAULT_EFFICIENCY_FACTOR: f64 = 0.85;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Conversion efficiency in percent: `power / (irradiance * area) * 100`.
///
/// `power` in W, `irradiance` in W/m², `area` in m².
#[must_use]
pub fn calculate_efficiency(power: f64, irradiance: f64, area: f64) -> Option<f64> {
    if irradiance <= 0.0 || area <= 0.0 {
        return None;
    }
    let efficiency = power / (irradiance * area) * 100.0;
    efficiency.is_finite().then(|| round2(efficiency))
}

/// Performance ratio in percent: actual over theoretical energy.
#[must_use]
pub fn calculate_performance_ratio(actual_energy: f64, theoretical_energy: f64) -> Option<f64> {
    if theoretical_energy <= 0.0 {
        return None;
    }
    let ratio = actual_energy / theoretical_energy * 100.0;
    ratio.is_finite().then(|| round2(ratio))
}

/// Expected daily yield in kWh.
#[must_use]
pub fn estimate_daily_energy(capacity_kw: f64, peak_sun_hours: f64, efficiency_factor: f64) -> f64 {
    round2(capacity_kw * peak_sun_hours * efficiency_factor)
}

/// Annual degradation in percent per year.
#[must_use]
pub fn calculate_degradation_rate(
    initial_performance: f64,
    current_performance: f64,
    years: f64,
) -> Option<f64> {
    if years <= 0.0 || initial_performance <= 0.0 {
        return None;
    }
    let rate = (initial_performance - current_performance) / initial_performance / years * 100.0;
    rate.is_finite().then(|| round2(rate))
}

/// The slice of a measurement anomaly detection looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub id: Option<i32>,
    pub timestamp: DateTime<Utc>,
    pub power: Option<f64>,
    pub irradiance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Anomaly {
    pub measurement_id: Option<i32>,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    pub value: f64,
}

/// Flag physically impossible readings.
///
/// Only sign checks for now; one reading can produce one anomaly per channel.
#[must_use]
pub fn detect_anomalies(readings: &[Reading]) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    for reading in readings {
        if let Some(power) = reading.power.filter(|p| *p < 0.0) {
            anomalies.push(Anomaly {
                measurement_id: reading.id,
                timestamp: reading.timestamp,
                reason: "Negative power value".to_string(),
                value: power,
            });
        }
        if let Some(irradiance) = reading.irradiance.filter(|i| *i < 0.0) {
            anomalies.push(Anomaly {
                measurement_id: reading.id,
                timestamp: reading.timestamp,
                reason: "Negative irradiance value".to_string(),
                value: irradiance,
            });
        }
    }

    anomalies
}
