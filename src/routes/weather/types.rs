use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::entity::{weather_current, weather_forecast};
use crate::error::{AppError, AppResult};
use crate::openmeteo::{models::hourly_from_payload, CurrentConditions};
use crate::routes::params::optional_instant;

#[derive(Debug, Deserialize, IntoParams)]
pub struct CurrentWeatherQuery {
    /// System identifier
    pub system_id: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ForecastQuery {
    /// System identifier
    pub system_id: String,
    /// Forecast horizon in days
    pub days: Option<u32>,
}

impl ForecastQuery {
    /// Requested horizon, defaulted and checked against the configured maximum.
    pub fn resolve_days(&self, default_days: u32, max_days: u32) -> AppResult<u32> {
        let days = self.days.unwrap_or(default_days);
        if !(1..=max_days).contains(&days) {
            return Err(AppError::validation(
                "days",
                format!("must be between 1 and {max_days}"),
            ));
        }
        Ok(days)
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MeasuredRadiationQuery {
    /// System identifier
    pub system_id: String,
    /// Start of time range (inclusive, UTC if no offset)
    #[serde(default, deserialize_with = "optional_instant")]
    #[param(value_type = Option<String>, format = DateTime)]
    pub start_time: Option<DateTime<Utc>>,
    /// End of time range (inclusive, UTC if no offset)
    #[serde(default, deserialize_with = "optional_instant")]
    #[param(value_type = Option<String>, format = DateTime)]
    pub end_time: Option<DateTime<Utc>>,
}

/// Current conditions flattened out of the stored provider payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentWeatherResponse {
    pub system_id: String,
    pub fetched_at: DateTime<Utc>,
    /// W/m²
    pub shortwave_radiation: Option<f64>,
    /// Percent
    pub cloud_cover: Option<f64>,
    /// °C
    pub temperature_2m: Option<f64>,
    /// m/s
    pub wind_speed_10m: Option<f64>,
}

impl From<weather_current::Model> for CurrentWeatherResponse {
    fn from(snapshot: weather_current::Model) -> Self {
        let current = CurrentConditions::from_payload(&snapshot.data);
        Self {
            system_id: snapshot.system_id,
            fetched_at: snapshot.fetched_at.with_timezone(&Utc),
            shortwave_radiation: current.shortwave_radiation,
            cloud_cover: current.cloud_cover,
            temperature_2m: current.temperature_2m,
            wind_speed_10m: current.wind_speed_10m,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastResponse {
    pub system_id: String,
    pub days: i32,
    pub fetched_at: DateTime<Utc>,
    /// The provider's `hourly` block as received
    #[schema(value_type = Option<Object>)]
    pub hourly: Option<Value>,
}

impl From<weather_forecast::Model> for ForecastResponse {
    fn from(snapshot: weather_forecast::Model) -> Self {
        Self {
            hourly: hourly_from_payload(&snapshot.data),
            system_id: snapshot.system_id,
            days: snapshot.days,
            fetched_at: snapshot.fetched_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeasuredRadiationPoint {
    pub timestamp: DateTime<Utc>,
    /// W/m²
    pub irradiance: Option<f64>,
    pub local_time: Option<DateTime<FixedOffset>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn forecast_days_default_and_bounds() {
        let query = |days| ForecastQuery {
            system_id: "PV-001".to_string(),
            days,
        };

        assert_eq!(query(None).resolve_days(2, 2).unwrap(), 2);
        assert_eq!(query(Some(1)).resolve_days(2, 2).unwrap(), 1);
        assert!(query(Some(0)).resolve_days(2, 2).is_err());
        assert!(query(Some(3)).resolve_days(2, 2).is_err());
        assert_eq!(query(Some(7)).resolve_days(2, 7).unwrap(), 7);
    }

    #[test]
    fn current_response_flattens_payload() {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, 0).unwrap();
        let snapshot = weather_current::Model {
            id: Uuid::new_v4(),
            system_id: "PV-001".to_string(),
            fetched_at: t.into(),
            data: json!({"current": {"shortwave_radiation": 455.0, "cloud_cover": 40}}),
            created_at: t.into(),
        };

        let response = CurrentWeatherResponse::from(snapshot);
        assert_eq!(response.fetched_at, t);
        assert_eq!(response.shortwave_radiation, Some(455.0));
        assert_eq!(response.cloud_cover, Some(40.0));
        assert_eq!(response.temperature_2m, None);
    }

    #[test]
    fn forecast_response_passes_hourly_through() {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, 0).unwrap();
        let hourly = json!({"time": ["2026-03-01T00:00"], "shortwave_radiation": [0.0]});
        let snapshot = weather_forecast::Model {
            id: Uuid::new_v4(),
            system_id: "PV-001".to_string(),
            days: 2,
            fetched_at: t.into(),
            data: json!({"hourly": hourly.clone(), "hourly_units": {}}),
            created_at: t.into(),
        };

        let response = ForecastResponse::from(snapshot);
        assert_eq!(response.days, 2);
        assert_eq!(response.hourly, Some(hourly));
    }
}
