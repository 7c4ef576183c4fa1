//! Fixed-path ingest for field loggers that post to `/`.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::routes::measurements::{CreateMeasurementRequest, MeasurementResponse};
use crate::services::measurements::{insert_one, to_response};

/// Map a logger payload onto a measurement.
///
/// `ts` is milliseconds since the Unix epoch; `params.Tbody` is module
/// temperature and `params.NR` irradiance. Everything else is ignored.
pub fn measurement_from_payload(payload: &Value) -> AppResult<CreateMeasurementRequest> {
    let system_id = payload
        .get("system_id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("system_id", "is required"))?;

    let timestamp = match payload.get("ts").and_then(Value::as_f64) {
        Some(ms) => Some(
            DateTime::<Utc>::from_timestamp_millis(ms as i64)
                .ok_or_else(|| AppError::validation("ts", "out of range"))?,
        ),
        None => None,
    };

    let params = payload.get("params");
    let param = |key: &str| params.and_then(|p| p.get(key)).and_then(Value::as_f64);

    Ok(CreateMeasurementRequest {
        system_id: system_id.to_string(),
        timestamp,
        temperature: param("Tbody"),
        irradiance: param("NR"),
        ..Default::default()
    })
}

/// Ingest a reading from a field logger
#[utoipa::path(
    post,
    path = "/",
    request_body(content = serde_json::Value, description = "Logger payload: system_id, ts (ms epoch), params.Tbody, params.NR"),
    responses(
        (status = 201, description = "Measurement stored", body = MeasurementResponse),
        (status = 400, description = "Body is not JSON"),
        (status = 422, description = "system_id missing or a value is invalid"),
    ),
    tag = "measurements"
)]
pub async fn ingest_from_device(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<MeasurementResponse>)> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest("Invalid JSON payload".to_string()))?;

    let req = measurement_from_payload(&payload)?;
    req.validate("")?;

    let stored = insert_one(&state, req).await?;
    tracing::debug!(id = stored.id, system_id = %stored.system_id, "Device reading stored");

    let response = to_response(&state, stored).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn maps_logger_fields() {
        let payload = json!({
            "system_id": "PV-001",
            "ts": 1_772_337_600_000_i64,
            "params": {"Tbody": 41.5, "NR": 812.0, "Vdc": 600}
        });

        let req = measurement_from_payload(&payload).unwrap();
        assert_eq!(req.system_id, "PV-001");
        assert_eq!(
            req.timestamp,
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, 0).unwrap())
        );
        assert_eq!(req.temperature, Some(41.5));
        assert_eq!(req.irradiance, Some(812.0));
        assert_eq!(req.power, None);
    }

    #[test]
    fn missing_ts_and_params_are_fine() {
        let req = measurement_from_payload(&json!({"system_id": "PV-001"})).unwrap();
        assert!(req.timestamp.is_none());
        assert!(req.temperature.is_none());
        assert!(req.irradiance.is_none());
    }

    #[test]
    fn system_id_is_required() {
        for payload in [json!({}), json!({"system_id": ""}), json!({"system_id": 7})] {
            assert!(matches!(
                measurement_from_payload(&payload),
                Err(AppError::Validation { .. })
            ));
        }
    }

    #[test]
    fn oversized_system_id_fails_validation() {
        let req = measurement_from_payload(&json!({"system_id": "P".repeat(65)})).unwrap();
        assert!(matches!(
            req.validate(""),
            Err(AppError::Validation { ref field, .. }) if field == "system_id"
        ));
    }
}
