use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{NotSet, Set},
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use crate::common::AppState;
use crate::entity::measurements;
use crate::error::{AppError, AppResult};
use crate::routes::measurements::types::{CreateMeasurementRequest, MeasurementResponse};
use crate::services::systems::system_timezone;

fn active_model(req: CreateMeasurementRequest) -> measurements::ActiveModel {
    let now = Utc::now();
    measurements::ActiveModel {
        id: NotSet,
        system_id: Set(req.system_id.trim().to_string()),
        timestamp: Set(req.timestamp.unwrap_or(now).into()),
        voltage: Set(req.voltage),
        current: Set(req.current),
        power: Set(req.power),
        irradiance: Set(req.irradiance),
        temperature: Set(req.temperature),
        ambient_temperature: Set(req.ambient_temperature),
        energy: Set(req.energy),
        efficiency: Set(req.efficiency),
        created_at: Set(now.into()),
    }
}

/// Store one validated measurement.
pub async fn insert_one(
    state: &AppState,
    req: CreateMeasurementRequest,
) -> AppResult<measurements::Model> {
    Ok(active_model(req).insert(&state.db).await?)
}

/// Store validated measurements in one transaction, in input order.
///
/// Either every row is written or none is.
pub async fn insert_batch(
    state: &AppState,
    batch: Vec<CreateMeasurementRequest>,
) -> AppResult<Vec<measurements::Model>> {
    let txn = state.db.begin().await?;

    let mut stored = Vec::with_capacity(batch.len());
    for req in batch {
        stored.push(active_model(req).insert(&txn).await?);
    }

    txn.commit().await?;
    Ok(stored)
}

/// Every measurement of one installation within an inclusive window, oldest
/// first.
///
/// Windows holding more than `MEASUREMENTS_MAX_LIMIT` rows are rejected rather
/// than cut short.
pub async fn window_oldest_first(
    state: &AppState,
    system_id: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> AppResult<Vec<measurements::Model>> {
    let mut query =
        measurements::Entity::find().filter(measurements::Column::SystemId.eq(system_id));

    if let Some(start) = start {
        query = query.filter(measurements::Column::Timestamp.gte(start.fixed_offset()));
    }
    if let Some(end) = end {
        query = query.filter(measurements::Column::Timestamp.lte(end.fixed_offset()));
    }

    let max = state.config.measurements_max_limit;
    let total = query.clone().count(&state.db).await?;
    if total > max {
        return Err(AppError::validation(
            "start_time",
            format!("range holds {total} measurements, at most {max} can be returned; narrow the time range"),
        ));
    }

    Ok(query
        .order_by_asc(measurements::Column::Timestamp)
        .order_by_asc(measurements::Column::Id)
        .all(&state.db)
        .await?)
}

/// Attach local-time projections, one zone lookup per distinct installation.
pub async fn to_responses(
    state: &AppState,
    rows: Vec<measurements::Model>,
) -> AppResult<Vec<MeasurementResponse>> {
    let mut zones: HashMap<String, Option<String>> = HashMap::new();
    let mut responses = Vec::with_capacity(rows.len());

    for row in rows {
        if !zones.contains_key(&row.system_id) {
            let zone = system_timezone(state, &row.system_id).await?;
            zones.insert(row.system_id.clone(), zone);
        }
        let zone = zones.get(&row.system_id).cloned().flatten();
        responses.push(MeasurementResponse::from_model(row, zone.as_deref()));
    }

    Ok(responses)
}

pub async fn to_response(
    state: &AppState,
    row: measurements::Model,
) -> AppResult<MeasurementResponse> {
    let zone = system_timezone(state, &row.system_id).await?;
    Ok(MeasurementResponse::from_model(row, zone.as_deref()))
}
