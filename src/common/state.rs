use moka::future::Cache;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::location::{PlaceResolver, TimezoneResolver};
use crate::openmeteo::WeatherClient;

/// Installation id → resolved timezone, for local-time projection on reads.
/// `None` values are cached too so unknown installations don't hit the store
/// on every row.
pub type ZoneCache = Cache<String, Option<String>>;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub weather_client: Arc<WeatherClient>,
    pub place_resolver: Arc<PlaceResolver>,
    pub timezone_resolver: Arc<TimezoneResolver>,
    pub zone_cache: ZoneCache,
    /// Caps concurrent CSV/NDJSON exports
    pub bulk_semaphore: Arc<Semaphore>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        config: Config,
        weather_client: WeatherClient,
        place_resolver: PlaceResolver,
        timezone_resolver: TimezoneResolver,
    ) -> Self {
        let zone_cache: ZoneCache = Cache::builder()
            .max_capacity(config.zone_cache_max_entries)
            .time_to_live(Duration::from_secs(config.zone_cache_ttl_seconds))
            .build();

        let bulk_semaphore = Arc::new(Semaphore::new(config.bulk_concurrent_limit));

        Self {
            db,
            config: Arc::new(config),
            weather_client: Arc::new(weather_client),
            place_resolver: Arc::new(place_resolver),
            timezone_resolver: Arc::new(timezone_resolver),
            zone_cache,
            bulk_semaphore,
        }
    }
}
