//! One-shot weather refresh for all active installations.
//!
//! Usage: `refresh-weather [current|forecast|all] [days]` (default `all`,
//! forecast horizon from `WEATHER_FORECAST_DEFAULT_DAYS`). Meant to be run from
//! cron or a container scheduler.

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;

use pv_monitor::config::Config;
use pv_monitor::error::AppError;
use pv_monitor::openmeteo::WeatherClient;
use pv_monitor::sync::{worker, RefreshKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    pv_monitor::init_tracing(config.log_format);

    let mut args = std::env::args().skip(1);
    let kind = RefreshKind::parse(args.next().as_deref().unwrap_or("all"))?;
    let days = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|d| (1..=config.weather_forecast_max_days).contains(d))
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "days must be between 1 and {}",
                    config.weather_forecast_max_days
                ))
            })?,
        None => config.weather_forecast_default_days,
    };

    let db = Database::connect(&config.database_url).await?;
    migration::Migrator::up(&db, None).await?;

    let client = WeatherClient::new(&config)?;

    tracing::info!(kind = ?kind, days, "Refreshing weather snapshots");
    let summary = worker::refresh(&db, &client, kind, days).await?;

    tracing::info!(
        refreshed = summary.refreshed,
        skipped = summary.skipped,
        failed = summary.failed,
        "Weather refresh complete"
    );

    if summary.failed > 0 && summary.refreshed == 0 {
        return Err("every weather refresh attempt failed".into());
    }
    Ok(())
}
