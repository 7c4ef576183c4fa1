use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use serde::Serialize;

use crate::entity::systems;
use crate::error::{AppError, AppResult};
use crate::location::PlaceResolver;
use crate::openmeteo::WeatherClient;
use crate::services::weather_cache::{fetch_and_store_current, fetch_and_store_forecast};

/// Which snapshots a refresh pass should fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    Current,
    Forecast,
    All,
}

impl RefreshKind {
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for anything other than
    /// `current`, `forecast` or `all`.
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "forecast" => Ok(Self::Forecast),
            "all" => Ok(Self::All),
            other => Err(AppError::BadRequest(format!(
                "unknown refresh kind '{other}', expected current, forecast or all"
            ))),
        }
    }

    #[must_use]
    pub fn includes_current(self) -> bool {
        matches!(self, Self::Current | Self::All)
    }

    #[must_use]
    pub fn includes_forecast(self) -> bool {
        matches!(self, Self::Forecast | Self::All)
    }
}

/// Outcome of one pass over the active installations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub refreshed: usize,
    /// Installations without coordinates
    pub skipped: usize,
    pub failed: usize,
}

impl RefreshSummary {
    fn merge(&mut self, other: Self) {
        self.refreshed += other.refreshed;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Active installations in a stable order.
pub async fn active_systems(db: &DatabaseConnection) -> AppResult<Vec<systems::Model>> {
    Ok(systems::Entity::find()
        .filter(systems::Column::IsActive.eq(true))
        .order_by_asc(systems::Column::SystemId)
        .all(db)
        .await?)
}

async fn refresh_each<F, Fut, T>(
    label: &'static str,
    systems_list: &[systems::Model],
    mut refresh: F,
) -> RefreshSummary
where
    F: FnMut(systems::Model) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut summary = RefreshSummary::default();

    for system in systems_list {
        if system.coordinates().is_none() {
            tracing::debug!(system_id = %system.system_id, kind = label, "No coordinates, skipping");
            summary.skipped += 1;
            continue;
        }

        match refresh(system.clone()).await {
            Ok(_) => summary.refreshed += 1,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    system_id = %system.system_id,
                    kind = label,
                    "Refresh failed, continuing"
                );
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Fetch current conditions for every active installation, one at a time.
///
/// A failure for one installation is logged and does not stop the pass.
///
/// # Errors
///
/// Returns an error only if the installation list cannot be read.
pub async fn refresh_current_all(
    db: &DatabaseConnection,
    client: &WeatherClient,
) -> AppResult<RefreshSummary> {
    let systems_list = active_systems(db).await?;
    let summary = refresh_each("current", &systems_list, |system| async move {
        fetch_and_store_current(db, client, &system).await
    })
    .await;

    tracing::info!(
        refreshed = summary.refreshed,
        skipped = summary.skipped,
        failed = summary.failed,
        "Current weather refresh finished"
    );
    Ok(summary)
}

/// Fetch a `days`-day forecast for every active installation, one at a time.
///
/// # Errors
///
/// Returns an error only if the installation list cannot be read.
pub async fn refresh_forecast_all(
    db: &DatabaseConnection,
    client: &WeatherClient,
    days: u32,
) -> AppResult<RefreshSummary> {
    let systems_list = active_systems(db).await?;
    let summary = refresh_each("forecast", &systems_list, |system| async move {
        fetch_and_store_forecast(db, client, &system, days).await
    })
    .await;

    tracing::info!(
        days,
        refreshed = summary.refreshed,
        skipped = summary.skipped,
        failed = summary.failed,
        "Forecast refresh finished"
    );
    Ok(summary)
}

/// Installations with coordinates but no place name, in a stable order.
pub async fn unnamed_located_systems(db: &DatabaseConnection) -> AppResult<Vec<systems::Model>> {
    Ok(systems::Entity::find()
        .filter(systems::Column::Latitude.is_not_null())
        .filter(systems::Column::Longitude.is_not_null())
        .filter(systems::Column::LocationName.is_null())
        .order_by_asc(systems::Column::SystemId)
        .all(db)
        .await?)
}

/// Reverse-geocode every unnamed installation and store the place name.
///
/// Each installation is updated on its own; a lookup that yields nothing
/// counts as failed and leaves the row untouched.
///
/// # Errors
///
/// Returns an error only if the installation list cannot be read.
pub async fn backfill_location_names(
    db: &DatabaseConnection,
    resolver: &PlaceResolver,
) -> AppResult<RefreshSummary> {
    let systems_list = unnamed_located_systems(db).await?;
    tracing::info!(count = systems_list.len(), "Installations missing a place name");

    let summary = refresh_each("location", &systems_list, |system| async move {
        let Some((latitude, longitude)) = system.coordinates() else {
            return Ok(());
        };
        let name = resolver.resolve(latitude, longitude).await.ok_or_else(|| {
            AppError::Upstream(format!("no place name for ({latitude}, {longitude})"))
        })?;

        let system_id = system.system_id.clone();
        let mut active: systems::ActiveModel = system.into();
        active.location_name = Set(Some(name.clone()));
        active.updated_at = Set(Utc::now().into());
        active.update(db).await?;

        tracing::info!(system_id = %system_id, location_name = %name, "Place name stored");
        Ok::<(), AppError>(())
    })
    .await;

    tracing::info!(
        updated = summary.refreshed,
        failed = summary.failed,
        "Location backfill finished"
    );
    Ok(summary)
}

/// Run the requested passes back to back.
///
/// # Errors
///
/// Returns an error only if the installation list cannot be read.
pub async fn refresh(
    db: &DatabaseConnection,
    client: &WeatherClient,
    kind: RefreshKind,
    forecast_days: u32,
) -> AppResult<RefreshSummary> {
    let mut summary = RefreshSummary::default();
    if kind.includes_current() {
        summary.merge(refresh_current_all(db, client).await?);
    }
    if kind.includes_forecast() {
        summary.merge(refresh_forecast_all(db, client, forecast_days).await?);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_kind_parsing() {
        assert_eq!(RefreshKind::parse("current").unwrap(), RefreshKind::Current);
        assert_eq!(RefreshKind::parse("FORECAST").unwrap(), RefreshKind::Forecast);
        assert_eq!(RefreshKind::parse("all").unwrap(), RefreshKind::All);
        assert!(RefreshKind::parse("hourly").is_err());

        assert!(RefreshKind::All.includes_current());
        assert!(RefreshKind::All.includes_forecast());
        assert!(!RefreshKind::Current.includes_forecast());
        assert!(!RefreshKind::Forecast.includes_current());
    }

    #[test]
    fn summaries_add_up() {
        let mut total = RefreshSummary { refreshed: 2, skipped: 1, failed: 0 };
        total.merge(RefreshSummary { refreshed: 1, skipped: 1, failed: 1 });
        assert_eq!(total, RefreshSummary { refreshed: 3, skipped: 2, failed: 1 });
    }
}
