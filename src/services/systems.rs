use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};

use crate::common::AppState;
use crate::entity::systems;
use crate::error::{AppError, AppResult};

/// Look up an installation by its system ID.
pub async fn find_system<C: ConnectionTrait>(db: &C, system_id: &str) -> AppResult<systems::Model> {
    systems::Entity::find()
        .filter(systems::Column::SystemId.eq(system_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("System '{system_id}' not found")))
}

/// Fill in a blank timezone and place name from coordinates.
///
/// Lookups that fail leave the field `None`; nothing here returns an error.
pub async fn resolve_location_fields(
    state: &AppState,
    coordinates: Option<(f64, f64)>,
    timezone: &mut Option<String>,
    location_name: &mut Option<String>,
) {
    let Some((latitude, longitude)) = coordinates else {
        return;
    };

    if timezone.as_deref().is_none_or(|tz| tz.trim().is_empty()) {
        *timezone = state.timezone_resolver.resolve(latitude, longitude);
        if timezone.is_none() {
            tracing::warn!(latitude, longitude, "Could not resolve timezone from coordinates");
        }
    }

    if location_name.as_deref().is_none_or(|n| n.trim().is_empty()) {
        *location_name = if state.place_resolver.is_enabled() {
            state.place_resolver.resolve(latitude, longitude).await
        } else {
            None
        };
    }
}

/// Resolved timezone of an installation, through the zone cache.
///
/// Unknown installations cache as `None`; create/update/delete invalidate.
pub async fn system_timezone(state: &AppState, system_id: &str) -> AppResult<Option<String>> {
    if let Some(cached) = state.zone_cache.get(system_id).await {
        return Ok(cached);
    }

    let timezone: Option<Option<String>> = systems::Entity::find()
        .select_only()
        .column(systems::Column::Timezone)
        .filter(systems::Column::SystemId.eq(system_id))
        .into_tuple()
        .one(&state.db)
        .await?;
    let timezone = timezone.flatten();

    state
        .zone_cache
        .insert(system_id.to_string(), timezone.clone())
        .await;

    tracing::debug!(system_id, timezone = ?timezone, "zone_cache_miss");
    Ok(timezone)
}
