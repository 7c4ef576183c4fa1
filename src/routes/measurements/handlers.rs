use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::common::AppState;
use crate::entity::measurements;
use crate::error::{AppError, AppResult};
use crate::routes::extract::{AppJson, AppPath, AppQuery};
use crate::routes::params::{pagination, validate_time_range};
use crate::services::measurements::{insert_batch, insert_one, to_response, to_responses};

use super::export::{build_csv_response, build_ndjson_response, determine_format, ExportFormat};
use super::types::{
    CreateMeasurementRequest, MeasurementBatchRequest, MeasurementResponse, MeasurementsQuery,
};

/// Record a single measurement
#[utoipa::path(
    post,
    path = "/measurements",
    request_body = CreateMeasurementRequest,
    responses(
        (status = 201, description = "Measurement stored", body = MeasurementResponse),
        (status = 422, description = "Validation failed"),
    ),
    tag = "measurements"
)]
pub async fn create_measurement(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateMeasurementRequest>,
) -> AppResult<(StatusCode, Json<MeasurementResponse>)> {
    req.validate("")?;

    let stored = insert_one(&state, req).await?;
    tracing::debug!(id = stored.id, system_id = %stored.system_id, "Measurement stored");

    let response = to_response(&state, stored).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Record many measurements at once
///
/// The batch is validated up front and written in one transaction; a single
/// invalid entry rejects the whole batch.
#[utoipa::path(
    post,
    path = "/measurements/batch",
    request_body = MeasurementBatchRequest,
    responses(
        (status = 201, description = "All measurements stored", body = Vec<MeasurementResponse>),
        (status = 422, description = "Validation failed; nothing stored"),
    ),
    tag = "measurements"
)]
pub async fn create_measurements_batch(
    State(state): State<AppState>,
    AppJson(batch): AppJson<MeasurementBatchRequest>,
) -> AppResult<(StatusCode, Json<Vec<MeasurementResponse>>)> {
    for (i, req) in batch.measurements.iter().enumerate() {
        req.validate(&format!("measurements[{i}]."))?;
    }

    let count = batch.measurements.len();
    let stored = insert_batch(&state, batch.measurements).await?;
    tracing::info!(count, "Measurement batch stored");

    let responses = to_responses(&state, stored).await?;
    Ok((StatusCode::CREATED, Json(responses)))
}

/// List measurements, newest first
///
/// Supports JSON, CSV, and NDJSON formats; CSV and NDJSON are streamed.
#[utoipa::path(
    get,
    path = "/measurements",
    params(MeasurementsQuery),
    responses(
        (status = 200, description = "Measurements retrieved successfully", body = Vec<MeasurementResponse>),
        (status = 422, description = "Invalid query parameters"),
        (status = 503, description = "Too many concurrent exports"),
    ),
    tag = "measurements"
)]
pub async fn list_measurements(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<MeasurementsQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    validate_time_range(query.start_time, query.end_time)?;
    let (limit, offset) = pagination(query.limit, query.offset, state.config.measurements_max_limit)?;
    let format = determine_format(&query.format, &headers)?;

    let _permit = if format.is_bulk() {
        match state.bulk_semaphore.clone().try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(
                    format = ?format,
                    status = StatusCode::SERVICE_UNAVAILABLE.as_u16(),
                    "bulk_request_rejected"
                );
                return Err(AppError::ServiceUnavailable(
                    "Too many concurrent bulk requests. Please try again later.".to_string(),
                ));
            }
        }
    } else {
        None
    };

    let mut db_query = measurements::Entity::find();

    if let Some(system_id) = query.system_id.as_deref() {
        db_query = db_query.filter(measurements::Column::SystemId.eq(system_id));
    }
    if let Some(start) = query.start_time {
        db_query = db_query.filter(measurements::Column::Timestamp.gte(start.fixed_offset()));
    }
    if let Some(end) = query.end_time {
        db_query = db_query.filter(measurements::Column::Timestamp.lte(end.fixed_offset()));
    }

    let rows = db_query
        .order_by_desc(measurements::Column::Timestamp)
        .order_by_desc(measurements::Column::Id)
        .offset(offset)
        .limit(limit)
        .all(&state.db)
        .await?;

    let responses = to_responses(&state, rows).await?;

    match format {
        ExportFormat::Csv => build_csv_response(responses),
        ExportFormat::Ndjson => build_ndjson_response(responses),
        ExportFormat::Json => Ok(Json(responses).into_response()),
    }
}

/// Get a single measurement
#[utoipa::path(
    get,
    path = "/measurements/{id}",
    params(
        ("id" = i32, Path, description = "Measurement ID"),
    ),
    responses(
        (status = 200, description = "Measurement retrieved successfully", body = MeasurementResponse),
        (status = 404, description = "Measurement not found"),
    ),
    tag = "measurements"
)]
pub async fn get_measurement(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<MeasurementResponse>> {
    let row = measurements::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Measurement {id} not found")))?;

    Ok(Json(to_response(&state, row).await?))
}

/// Delete a measurement
#[utoipa::path(
    delete,
    path = "/measurements/{id}",
    params(
        ("id" = i32, Path, description = "Measurement ID"),
    ),
    responses(
        (status = 204, description = "Measurement deleted"),
        (status = 404, description = "Measurement not found"),
    ),
    tag = "measurements"
)]
pub async fn delete_measurement(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<StatusCode> {
    let result = measurements::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Measurement {id} not found")));
    }

    tracing::info!(id, "Measurement deleted");
    Ok(StatusCode::NO_CONTENT)
}
