use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::common::AppState;
use crate::sync::worker;

/// Spawn the in-process refresh tasks whose interval is non-zero.
///
/// Returns how many tasks were started.
pub fn spawn_enabled(state: &AppState) -> usize {
    let mut started = 0;

    if state.config.sync_current_interval_seconds > 0 {
        tokio::spawn(run_current_refresh(state.clone()));
        started += 1;
    }
    if state.config.sync_forecast_interval_seconds > 0 {
        tokio::spawn(run_forecast_refresh(state.clone()));
        started += 1;
    }

    if started == 0 {
        tracing::info!("In-process weather refresh disabled; use the refresh-weather binary");
    }
    started
}

/// Refresh current conditions for all active installations on a schedule.
pub async fn run_current_refresh(state: AppState) {
    let interval_secs = state.config.sync_current_interval_seconds;
    tracing::info!(interval_secs, "Starting current weather refresh scheduler");

    let mut ticker = interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // First tick completes immediately
        ticker.tick().await;

        if let Err(e) = worker::refresh_current_all(&state.db, &state.weather_client).await {
            tracing::error!(error = %e, "Current weather refresh pass failed");
        }
    }
}

/// Refresh forecasts (default horizon) for all active installations on a schedule.
pub async fn run_forecast_refresh(state: AppState) {
    let interval_secs = state.config.sync_forecast_interval_seconds;
    let days = state.config.weather_forecast_default_days;
    tracing::info!(interval_secs, days, "Starting forecast refresh scheduler");

    let mut ticker = interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if let Err(e) = worker::refresh_forecast_all(&state.db, &state.weather_client, days).await {
            tracing::error!(error = %e, "Forecast refresh pass failed");
        }
    }
}
