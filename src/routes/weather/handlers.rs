use axum::{
    extract::State,
    Json,
};
use chrono::Utc;

use crate::common::AppState;
use crate::error::AppResult;
use crate::location::to_local;
use crate::routes::extract::AppQuery;
use crate::routes::params::validate_time_range;
use crate::services::measurements::window_oldest_first;
use crate::services::systems::system_timezone;
use crate::services::weather_cache;

use super::types::{
    CurrentWeatherQuery, CurrentWeatherResponse, ForecastQuery, ForecastResponse,
    MeasuredRadiationPoint, MeasuredRadiationQuery,
};

/// Current weather at an installation
///
/// Served from the latest snapshot while it is fresh, otherwise fetched from
/// Open-Meteo and stored.
#[utoipa::path(
    get,
    path = "/weather/current",
    params(CurrentWeatherQuery),
    responses(
        (status = 200, description = "Current conditions", body = CurrentWeatherResponse),
        (status = 404, description = "System not found or has no coordinates"),
        (status = 502, description = "Weather provider failed"),
    ),
    tag = "weather"
)]
pub async fn get_current_weather(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CurrentWeatherQuery>,
) -> AppResult<Json<CurrentWeatherResponse>> {
    let snapshot = weather_cache::get_current(&state, &query.system_id).await?;
    Ok(Json(snapshot.into()))
}

/// Hourly forecast for an installation
#[utoipa::path(
    get,
    path = "/weather/forecast",
    params(ForecastQuery),
    responses(
        (status = 200, description = "Hourly forecast", body = ForecastResponse),
        (status = 404, description = "System not found or has no coordinates"),
        (status = 422, description = "Horizon out of range"),
        (status = 502, description = "Weather provider failed"),
    ),
    tag = "weather"
)]
pub async fn get_weather_forecast(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ForecastQuery>,
) -> AppResult<Json<ForecastResponse>> {
    let days = query.resolve_days(
        state.config.weather_forecast_default_days,
        state.config.weather_forecast_max_days,
    )?;
    let snapshot = weather_cache::get_forecast(&state, &query.system_id, days).await?;
    Ok(Json(snapshot.into()))
}

/// Latest stored current weather, without contacting the provider
#[utoipa::path(
    get,
    path = "/weather/current_cached",
    params(CurrentWeatherQuery),
    responses(
        (status = 200, description = "Stored current conditions", body = CurrentWeatherResponse),
        (status = 404, description = "Nothing cached for this system"),
    ),
    tag = "weather"
)]
pub async fn get_current_weather_cached(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CurrentWeatherQuery>,
) -> AppResult<Json<CurrentWeatherResponse>> {
    let snapshot = weather_cache::get_current_cached(&state.db, &query.system_id).await?;
    Ok(Json(snapshot.into()))
}

/// Latest stored forecast, without contacting the provider
#[utoipa::path(
    get,
    path = "/weather/forecast_cached",
    params(ForecastQuery),
    responses(
        (status = 200, description = "Stored forecast", body = ForecastResponse),
        (status = 404, description = "Nothing cached for this system and horizon"),
        (status = 422, description = "Horizon out of range"),
    ),
    tag = "weather"
)]
pub async fn get_weather_forecast_cached(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ForecastQuery>,
) -> AppResult<Json<ForecastResponse>> {
    let days = query.resolve_days(
        state.config.weather_forecast_default_days,
        state.config.weather_forecast_max_days,
    )?;
    let snapshot = weather_cache::get_forecast_cached(&state.db, &query.system_id, days).await?;
    Ok(Json(snapshot.into()))
}

/// Measured irradiance for comparison against forecasts, oldest first
#[utoipa::path(
    get,
    path = "/weather/measured_radiation",
    params(MeasuredRadiationQuery),
    responses(
        (status = 200, description = "Measured irradiance series", body = Vec<MeasuredRadiationPoint>),
        (status = 422, description = "Invalid time range or more rows than MEASUREMENTS_MAX_LIMIT"),
    ),
    tag = "weather"
)]
pub async fn get_measured_radiation(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<MeasuredRadiationQuery>,
) -> AppResult<Json<Vec<MeasuredRadiationPoint>>> {
    validate_time_range(query.start_time, query.end_time)?;

    let rows =
        window_oldest_first(&state, &query.system_id, query.start_time, query.end_time).await?;

    let timezone = system_timezone(&state, &query.system_id).await?;

    let points = rows
        .into_iter()
        .map(|row| {
            let timestamp = row.timestamp.with_timezone(&Utc);
            MeasuredRadiationPoint {
                timestamp,
                irradiance: row.irradiance,
                local_time: timezone.as_deref().and_then(|tz| to_local(timestamp, tz)),
            }
        })
        .collect();

    Ok(Json(points))
}
