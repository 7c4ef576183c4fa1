use axum::{
    extract::State,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::performance::{
    calculate_efficiency, detect_anomalies, estimate_daily_energy, Anomaly, Reading,
    DEFAULT_EFFICIENCY_FACTOR,
};
use crate::routes::extract::AppQuery;
use crate::routes::params::{
    optional_instant, require_finite, require_non_negative, validate_time_range,
};
use crate::services::measurements::window_oldest_first;
use crate::services::systems::find_system;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AnomaliesQuery {
    /// System identifier
    pub system_id: String,
    /// Start of time range (inclusive, UTC if no offset)
    #[serde(default, deserialize_with = "optional_instant")]
    #[param(value_type = Option<String>, format = DateTime)]
    pub start_time: Option<DateTime<Utc>>,
    /// End of time range (inclusive, UTC if no offset)
    #[serde(default, deserialize_with = "optional_instant")]
    #[param(value_type = Option<String>, format = DateTime)]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnomaliesResponse {
    pub system_id: String,
    /// Number of measurements examined
    pub checked: usize,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DailyEnergyQuery {
    /// System identifier
    pub system_id: String,
    /// Equivalent hours of 1000 W/m² sun
    pub peak_sun_hours: f64,
    /// System derate (default 0.85)
    pub efficiency_factor: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailyEnergyResponse {
    pub system_id: String,
    pub capacity_kw: f64,
    pub peak_sun_hours: f64,
    pub efficiency_factor: f64,
    pub estimated_kwh: f64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EfficiencyQuery {
    /// Output power, W
    pub power: f64,
    /// Plane-of-array irradiance, W/m²
    pub irradiance: f64,
    /// Panel area, m²
    pub area: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EfficiencyResponse {
    pub power: f64,
    pub irradiance: f64,
    pub area: f64,
    /// Percent; null when irradiance or area is not positive
    pub efficiency: Option<f64>,
}

/// Flag impossible readings in a stored measurement window
#[utoipa::path(
    get,
    path = "/analytics/anomalies",
    params(AnomaliesQuery),
    responses(
        (status = 200, description = "Anomalies found", body = AnomaliesResponse),
        (status = 422, description = "Invalid time range or more rows than MEASUREMENTS_MAX_LIMIT"),
    ),
    tag = "analytics"
)]
pub async fn get_anomalies(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AnomaliesQuery>,
) -> AppResult<Json<AnomaliesResponse>> {
    validate_time_range(query.start_time, query.end_time)?;

    let rows =
        window_oldest_first(&state, &query.system_id, query.start_time, query.end_time).await?;

    let readings: Vec<Reading> = rows
        .iter()
        .map(|m| Reading {
            id: Some(m.id),
            timestamp: m.timestamp.with_timezone(&Utc),
            power: m.power,
            irradiance: m.irradiance,
        })
        .collect();

    let anomalies = detect_anomalies(&readings);
    if !anomalies.is_empty() {
        tracing::info!(
            system_id = %query.system_id,
            count = anomalies.len(),
            "Anomalous measurements found"
        );
    }

    Ok(Json(AnomaliesResponse {
        system_id: query.system_id,
        checked: readings.len(),
        anomalies,
    }))
}

/// Expected daily yield from an installation's capacity
#[utoipa::path(
    get,
    path = "/analytics/daily_energy",
    params(DailyEnergyQuery),
    responses(
        (status = 200, description = "Estimated yield", body = DailyEnergyResponse),
        (status = 404, description = "System not found"),
        (status = 422, description = "System has no capacity or inputs are invalid"),
    ),
    tag = "analytics"
)]
pub async fn get_daily_energy(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<DailyEnergyQuery>,
) -> AppResult<Json<DailyEnergyResponse>> {
    require_non_negative("peak_sun_hours", Some(query.peak_sun_hours))?;
    require_non_negative("efficiency_factor", query.efficiency_factor)?;

    let system = find_system(&state.db, &query.system_id).await?;
    let capacity_kw = system
        .capacity
        .ok_or_else(|| AppError::validation("capacity", "system has no capacity configured"))?;
    let efficiency_factor = query.efficiency_factor.unwrap_or(DEFAULT_EFFICIENCY_FACTOR);

    Ok(Json(DailyEnergyResponse {
        estimated_kwh: estimate_daily_energy(capacity_kw, query.peak_sun_hours, efficiency_factor),
        system_id: system.system_id,
        capacity_kw,
        peak_sun_hours: query.peak_sun_hours,
        efficiency_factor,
    }))
}

/// Conversion efficiency for a power/irradiance/area triple
#[utoipa::path(
    get,
    path = "/analytics/efficiency",
    params(EfficiencyQuery),
    responses(
        (status = 200, description = "Efficiency, null when undefined", body = EfficiencyResponse),
        (status = 422, description = "Non-finite input"),
    ),
    tag = "analytics"
)]
pub async fn get_efficiency(AppQuery(query): AppQuery<EfficiencyQuery>) -> AppResult<Json<EfficiencyResponse>> {
    require_finite("power", Some(query.power))?;
    require_finite("irradiance", Some(query.irradiance))?;
    require_finite("area", Some(query.area))?;

    Ok(Json(EfficiencyResponse {
        efficiency: calculate_efficiency(query.power, query.irradiance, query.area),
        power: query.power,
        irradiance: query.irradiance,
        area: query.area,
    }))
}
