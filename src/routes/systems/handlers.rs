use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::{NotSet, Set, Unchanged}, ColumnTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, SqlErr,
};
use serde_json::Value;

use crate::common::AppState;
use crate::entity::systems;
use crate::error::{AppError, AppResult};
use crate::routes::extract::{AppJson, AppPath, AppQuery};
use crate::routes::params::{non_blank, pagination};
use crate::services::systems::{find_system, resolve_location_fields};

use super::types::{CreateSystemRequest, SystemResponse, SystemsQuery, UpdateSystemRequest};

/// Register a new installation
///
/// Timezone and place name are derived from the coordinates when not given.
#[utoipa::path(
    post,
    path = "/systems",
    request_body = CreateSystemRequest,
    responses(
        (status = 201, description = "System created", body = SystemResponse),
        (status = 400, description = "A system with this ID already exists"),
        (status = 422, description = "Validation failed"),
    ),
    tag = "systems"
)]
pub async fn create_system(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateSystemRequest>,
) -> AppResult<(StatusCode, Json<SystemResponse>)> {
    req.validate()?;
    let system_id = req.system_id.trim().to_string();

    let existing = systems::Entity::find()
        .filter(systems::Column::SystemId.eq(&system_id))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(format!(
            "System with ID '{system_id}' already exists"
        )));
    }

    let mut timezone = non_blank(req.timezone);
    let mut location_name = non_blank(req.location_name);
    let coordinates = req.latitude.zip(req.longitude);
    resolve_location_fields(&state, coordinates, &mut timezone, &mut location_name).await;

    let now = Utc::now();
    let system = systems::ActiveModel {
        id: NotSet,
        system_id: Set(system_id.clone()),
        name: Set(req.name),
        capacity: Set(req.capacity),
        panel_count: Set(req.panel_count),
        panel_wattage: Set(req.panel_wattage),
        inverter_model: Set(req.inverter_model),
        location: Set(req.location),
        latitude: Set(req.latitude),
        longitude: Set(req.longitude),
        timezone: Set(timezone),
        location_name: Set(location_name),
        tilt_angle: Set(req.tilt_angle),
        azimuth: Set(req.azimuth),
        is_active: Set(req.is_active),
        installation_date: Set(req.installation_date.map(Into::into)),
        extra_metadata: Set(req.extra_metadata.map(Value::Object)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let created = system.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict(format!("System with ID '{system_id}' already exists"))
        }
        _ => AppError::Database(e),
    })?;

    state.zone_cache.invalidate(&created.system_id).await;

    tracing::info!(
        system_id = %created.system_id,
        timezone = ?created.timezone,
        location_name = ?created.location_name,
        "System registered"
    );

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// List installations, newest first
#[utoipa::path(
    get,
    path = "/systems",
    params(SystemsQuery),
    responses(
        (status = 200, description = "Systems retrieved successfully", body = Vec<SystemResponse>),
        (status = 422, description = "Invalid pagination"),
    ),
    tag = "systems"
)]
pub async fn list_systems(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SystemsQuery>,
) -> AppResult<Json<Vec<SystemResponse>>> {
    let (limit, offset) = pagination(query.limit, query.offset, state.config.measurements_max_limit)?;

    let mut db_query = systems::Entity::find();

    if let Some(is_active) = query.is_active {
        db_query = db_query.filter(systems::Column::IsActive.eq(is_active));
    }

    let systems_list = db_query
        .order_by_desc(systems::Column::CreatedAt)
        .order_by_desc(systems::Column::Id)
        .offset(offset)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(systems_list.into_iter().map(SystemResponse::from).collect()))
}

/// Get an installation by its system ID
#[utoipa::path(
    get,
    path = "/systems/{system_id}",
    params(
        ("system_id" = String, Path, description = "System identifier"),
    ),
    responses(
        (status = 200, description = "System retrieved successfully", body = SystemResponse),
        (status = 404, description = "System not found"),
    ),
    tag = "systems"
)]
pub async fn get_system(
    State(state): State<AppState>,
    AppPath(system_id): AppPath<String>,
) -> AppResult<Json<SystemResponse>> {
    let system = find_system(&state.db, &system_id).await?;
    Ok(Json(system.into()))
}

/// Partially update an installation
///
/// Moving the coordinates without supplying a timezone re-derives it.
#[utoipa::path(
    put,
    path = "/systems/{system_id}",
    params(
        ("system_id" = String, Path, description = "System identifier"),
    ),
    request_body = UpdateSystemRequest,
    responses(
        (status = 200, description = "System updated", body = SystemResponse),
        (status = 404, description = "System not found"),
        (status = 422, description = "Validation failed"),
    ),
    tag = "systems"
)]
pub async fn update_system(
    State(state): State<AppState>,
    AppPath(system_id): AppPath<String>,
    AppJson(patch): AppJson<UpdateSystemRequest>,
) -> AppResult<Json<SystemResponse>> {
    patch.validate()?;
    let existing = find_system(&state.db, &system_id).await?;

    let mut model = existing.clone();
    let outcome = patch.apply(&mut model);

    if outcome.coordinates_changed {
        if !outcome.timezone_set {
            model.timezone = None;
        }
        if !outcome.location_name_set {
            model.location_name = None;
        }
    }
    resolve_location_fields(
        &state,
        model.coordinates(),
        &mut model.timezone,
        &mut model.location_name,
    )
    .await;

    let system = systems::ActiveModel {
        id: Unchanged(existing.id),
        system_id: Unchanged(existing.system_id),
        name: Set(model.name),
        capacity: Set(model.capacity),
        panel_count: Set(model.panel_count),
        panel_wattage: Set(model.panel_wattage),
        inverter_model: Set(model.inverter_model),
        location: Set(model.location),
        latitude: Set(model.latitude),
        longitude: Set(model.longitude),
        timezone: Set(model.timezone),
        location_name: Set(model.location_name),
        tilt_angle: Set(model.tilt_angle),
        azimuth: Set(model.azimuth),
        is_active: Set(model.is_active),
        installation_date: Set(model.installation_date),
        extra_metadata: Set(model.extra_metadata),
        created_at: Unchanged(existing.created_at),
        updated_at: Set(Utc::now().into()),
    };

    let updated = system.update(&state.db).await?;
    state.zone_cache.invalidate(&updated.system_id).await;

    tracing::info!(system_id = %updated.system_id, "System updated");

    Ok(Json(updated.into()))
}

/// Delete an installation
///
/// Measurements and weather snapshots for the system are left in place.
#[utoipa::path(
    delete,
    path = "/systems/{system_id}",
    params(
        ("system_id" = String, Path, description = "System identifier"),
    ),
    responses(
        (status = 204, description = "System deleted"),
        (status = 404, description = "System not found"),
    ),
    tag = "systems"
)]
pub async fn delete_system(
    State(state): State<AppState>,
    AppPath(system_id): AppPath<String>,
) -> AppResult<StatusCode> {
    let system = find_system(&state.db, &system_id).await?;

    systems::Entity::delete_by_id(system.id)
        .exec(&state.db)
        .await?;
    state.zone_cache.invalidate(&system.system_id).await;

    tracing::info!(system_id = %system.system_id, "System deleted");

    Ok(StatusCode::NO_CONTENT)
}
