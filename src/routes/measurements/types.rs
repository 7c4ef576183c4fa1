use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::measurements;
use crate::error::AppResult;
use crate::location::to_local;
use crate::routes::params::{
    optional_instant, require_finite, require_max_len, require_non_negative, require_not_blank,
    SYSTEM_ID_MAX_LEN,
};

/// One sensor reading. Only `system_id` is required.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateMeasurementRequest {
    pub system_id: String,
    /// Defaults to the time of ingestion; values without an offset are UTC
    #[serde(default, deserialize_with = "optional_instant")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub timestamp: Option<DateTime<Utc>>,
    /// V
    pub voltage: Option<f64>,
    /// A
    pub current: Option<f64>,
    /// W
    pub power: Option<f64>,
    /// W/m²
    pub irradiance: Option<f64>,
    /// Module temperature, °C
    pub temperature: Option<f64>,
    /// °C
    pub ambient_temperature: Option<f64>,
    /// Wh
    pub energy: Option<f64>,
    /// Percent
    pub efficiency: Option<f64>,
}

impl CreateMeasurementRequest {
    /// Validate, prefixing field names with `prefix` (used for batch positions).
    pub fn validate(&self, prefix: &str) -> AppResult<()> {
        let field = |name: &str| format!("{prefix}{name}");

        require_not_blank(&field("system_id"), &self.system_id)?;
        require_max_len(&field("system_id"), Some(self.system_id.trim()), SYSTEM_ID_MAX_LEN)?;
        require_finite(&field("voltage"), self.voltage)?;
        require_finite(&field("current"), self.current)?;
        require_finite(&field("power"), self.power)?;
        require_non_negative(&field("irradiance"), self.irradiance)?;
        require_finite(&field("temperature"), self.temperature)?;
        require_finite(&field("ambient_temperature"), self.ambient_temperature)?;
        require_finite(&field("energy"), self.energy)?;
        require_finite(&field("efficiency"), self.efficiency)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MeasurementBatchRequest {
    pub measurements: Vec<CreateMeasurementRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MeasurementResponse {
    pub id: i32,
    pub system_id: String,
    pub timestamp: DateTime<Utc>,
    /// `timestamp` in the installation's timezone; null when unknown
    pub local_time: Option<DateTime<FixedOffset>>,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub power: Option<f64>,
    pub irradiance: Option<f64>,
    pub temperature: Option<f64>,
    pub ambient_temperature: Option<f64>,
    pub energy: Option<f64>,
    pub efficiency: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl MeasurementResponse {
    #[must_use]
    pub fn from_model(m: measurements::Model, timezone: Option<&str>) -> Self {
        let timestamp = m.timestamp.with_timezone(&Utc);
        Self {
            id: m.id,
            system_id: m.system_id,
            timestamp,
            local_time: timezone.and_then(|tz| to_local(timestamp, tz)),
            voltage: m.voltage,
            current: m.current,
            power: m.power,
            irradiance: m.irradiance,
            temperature: m.temperature,
            ambient_temperature: m.ambient_temperature,
            energy: m.energy,
            efficiency: m.efficiency,
            created_at: m.created_at.with_timezone(&Utc),
        }
    }
}

fn default_format() -> String {
    "json".to_string()
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MeasurementsQuery {
    /// Filter by system ID
    pub system_id: Option<String>,
    /// Start of time range (inclusive, UTC if no offset)
    #[serde(default, deserialize_with = "optional_instant")]
    #[param(value_type = Option<String>, format = DateTime)]
    pub start_time: Option<DateTime<Utc>>,
    /// End of time range (inclusive, UTC if no offset)
    #[serde(default, deserialize_with = "optional_instant")]
    #[param(value_type = Option<String>, format = DateTime)]
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum number of results (default 100)
    pub limit: Option<u64>,
    /// Offset for pagination
    pub offset: Option<u64>,
    /// Response format: json (default), csv, ndjson
    #[serde(default = "default_format")]
    pub format: String,
}
