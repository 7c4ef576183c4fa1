//! Fill in `location_name` for installations registered with coordinates but
//! without a place name, e.g. before `AMAP_KEY` was configured.
//!
//! Usage: `backfill-locations`

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;

use pv_monitor::config::Config;
use pv_monitor::location::PlaceResolver;
use pv_monitor::sync::worker;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    pv_monitor::init_tracing(config.log_format);

    let resolver = PlaceResolver::new(&config)?;
    if !resolver.is_enabled() {
        return Err("AMAP_KEY is not set, nothing to resolve place names with".into());
    }

    let db = Database::connect(&config.database_url).await?;
    migration::Migrator::up(&db, None).await?;

    let summary = worker::backfill_location_names(&db, &resolver).await?;

    if summary.failed > 0 && summary.refreshed == 0 {
        return Err("no place name could be resolved".into());
    }
    Ok(())
}
