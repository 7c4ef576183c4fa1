use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Variables requested for both current conditions and hourly forecasts.
pub const WEATHER_VARIABLES: &str = "shortwave_radiation,cloud_cover,temperature_2m,wind_speed_10m";

/// Where to ask the provider about.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// IANA zone for the provider's local timestamps; `auto` when unknown
    pub timezone: Option<String>,
}

impl WeatherLocation {
    #[must_use]
    pub fn timezone_param(&self) -> &str {
        self.timezone
            .as_deref()
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or("auto")
    }
}

/// The `current` block of an Open-Meteo forecast response.
///
/// Every field is optional: the stored payload is opaque and may predate a
/// variable being requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    #[serde(default)]
    pub shortwave_radiation: Option<f64>,
    #[serde(default)]
    pub cloud_cover: Option<f64>,
    #[serde(default)]
    pub temperature_2m: Option<f64>,
    #[serde(default)]
    pub wind_speed_10m: Option<f64>,
}

impl CurrentConditions {
    /// Extract current conditions from a raw payload, tolerating missing or odd shapes.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        payload
            .get("current")
            .cloned()
            .and_then(|current| serde_json::from_value(current).ok())
            .unwrap_or_default()
    }
}

/// The `hourly` block of a forecast payload, passed through untouched.
#[must_use]
pub fn hourly_from_payload(payload: &Value) -> Option<Value> {
    payload.get("hourly").filter(|h| h.is_object()).cloned()
}
