//! Per-installation weather snapshots with a freshness policy.
//!
//! A snapshot is reused while its `fetched_at` falls inside the freshness
//! window; otherwise the provider is called once and the response stored as a
//! new row. Rows are never updated or pruned.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::common::AppState;
use crate::entity::{systems, weather_current, weather_forecast};
use crate::error::{AppError, AppResult};
use crate::openmeteo::{WeatherClient, WeatherLocation};
use crate::services::systems::find_system;

/// How long a stored snapshot may be served before refetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Any stored snapshot is reused regardless of age
    Always,
    Within(Duration),
}

impl Freshness {
    #[must_use]
    pub fn from_seconds(seconds: Option<u64>) -> Self {
        match seconds {
            None => Self::Always,
            Some(s) => Self::Within(Duration::seconds(i64::try_from(s).unwrap_or(i64::MAX))),
        }
    }

    #[must_use]
    pub fn is_fresh(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::Always => true,
            Self::Within(max_age) => now - fetched_at <= *max_age,
        }
    }
}

/// Provider query for an installation. Installations without coordinates
/// cannot be looked up.
pub fn weather_location(system: &systems::Model) -> AppResult<WeatherLocation> {
    let (latitude, longitude) = system.coordinates().ok_or_else(|| {
        AppError::NotFound(format!(
            "System '{}' has no coordinates configured",
            system.system_id
        ))
    })?;

    Ok(WeatherLocation {
        latitude,
        longitude,
        timezone: system.timezone.clone(),
    })
}

pub async fn latest_current<C: ConnectionTrait>(
    db: &C,
    system_id: &str,
) -> AppResult<Option<weather_current::Model>> {
    Ok(weather_current::Entity::find()
        .filter(weather_current::Column::SystemId.eq(system_id))
        .order_by_desc(weather_current::Column::FetchedAt)
        .one(db)
        .await?)
}

pub async fn latest_forecast<C: ConnectionTrait>(
    db: &C,
    system_id: &str,
    days: u32,
) -> AppResult<Option<weather_forecast::Model>> {
    Ok(weather_forecast::Entity::find()
        .filter(weather_forecast::Column::SystemId.eq(system_id))
        .filter(weather_forecast::Column::Days.eq(days as i32))
        .order_by_desc(weather_forecast::Column::FetchedAt)
        .one(db)
        .await?)
}

/// Call the provider for current conditions and store the payload as received.
pub async fn fetch_and_store_current<C: ConnectionTrait>(
    db: &C,
    client: &WeatherClient,
    system: &systems::Model,
) -> AppResult<weather_current::Model> {
    let location = weather_location(system)?;
    let data = client.fetch_current(&location).await?;

    let now = Utc::now();
    let snapshot = weather_current::ActiveModel {
        id: Set(Uuid::new_v4()),
        system_id: Set(system.system_id.clone()),
        fetched_at: Set(now.into()),
        data: Set(data),
        created_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    tracing::info!(system_id = %system.system_id, "Stored current weather snapshot");
    Ok(snapshot)
}

/// Call the provider for a `days`-day forecast and store the payload as received.
pub async fn fetch_and_store_forecast<C: ConnectionTrait>(
    db: &C,
    client: &WeatherClient,
    system: &systems::Model,
    days: u32,
) -> AppResult<weather_forecast::Model> {
    let location = weather_location(system)?;
    let data = client.fetch_forecast(&location, days).await?;

    let now = Utc::now();
    let snapshot = weather_forecast::ActiveModel {
        id: Set(Uuid::new_v4()),
        system_id: Set(system.system_id.clone()),
        days: Set(days as i32),
        fetched_at: Set(now.into()),
        data: Set(data),
        created_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    tracing::info!(system_id = %system.system_id, days, "Stored forecast snapshot");
    Ok(snapshot)
}

/// Current conditions, refetched when the latest snapshot is stale.
pub async fn get_current(state: &AppState, system_id: &str) -> AppResult<weather_current::Model> {
    let system = find_system(&state.db, system_id).await?;
    let freshness = Freshness::from_seconds(Some(state.config.weather_current_max_age_seconds));

    if let Some(snapshot) = latest_current(&state.db, &system.system_id).await? {
        if freshness.is_fresh(snapshot.fetched_at.with_timezone(&Utc), Utc::now()) {
            tracing::debug!(system_id, "current_weather_cache_hit");
            return Ok(snapshot);
        }
    }

    fetch_and_store_current(&state.db, &state.weather_client, &system).await
}

/// Forecast for `days`, refetched when no fresh snapshot with that horizon exists.
pub async fn get_forecast(
    state: &AppState,
    system_id: &str,
    days: u32,
) -> AppResult<weather_forecast::Model> {
    let system = find_system(&state.db, system_id).await?;
    let freshness = Freshness::from_seconds(state.config.weather_forecast_max_age_seconds);

    if let Some(snapshot) = latest_forecast(&state.db, &system.system_id, days).await? {
        if freshness.is_fresh(snapshot.fetched_at.with_timezone(&Utc), Utc::now()) {
            tracing::debug!(system_id, days, "forecast_cache_hit");
            return Ok(snapshot);
        }
    }

    fetch_and_store_forecast(&state.db, &state.weather_client, &system, days).await
}

/// Latest stored current conditions; never calls the provider.
pub async fn get_current_cached<C: ConnectionTrait>(
    db: &C,
    system_id: &str,
) -> AppResult<weather_current::Model> {
    latest_current(db, system_id).await?.ok_or_else(|| {
        AppError::NotFound(format!("No cached current weather for system '{system_id}'"))
    })
}

/// Latest stored forecast for `days`; never calls the provider.
pub async fn get_forecast_cached<C: ConnectionTrait>(
    db: &C,
    system_id: &str,
    days: u32,
) -> AppResult<weather_forecast::Model> {
    latest_forecast(db, system_id, days).await?.ok_or_else(|| {
        AppError::NotFound(format!(
            "No cached {days}-day forecast for system '{system_id}'"
        ))
    })
}
