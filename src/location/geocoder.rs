use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::routes::params::LOCATION_NAME_MAX_LEN;

/// Reverse geocoder backed by the AMap `regeo` endpoint.
///
/// Disabled (always `None`) when no API key is configured.
pub struct PlaceResolver {
    http_client: Client,
    base_url: String,
    key: Option<String>,
}

impl PlaceResolver {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.geocoder_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.geocoder_base_url.clone(),
            key: config.geocoder_key.clone(),
        })
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Street-level place name for a coordinate pair, or `None` on any failure.
    pub async fn resolve(&self, latitude: f64, longitude: f64) -> Option<String> {
        let key = self.key.as_deref()?;

        let response = match self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("location", format!("{longitude},{latitude}")),
                ("key", key.to_string()),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, latitude, longitude, "Reverse geocoding request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Reverse geocoding returned error status");
            return None;
        }

        match response.json::<Value>().await {
            Ok(body) => place_name_from_response(&body),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse reverse geocoding response");
                None
            }
        }
    }
}

/// Join province, city, district and township from a `regeo` response.
///
/// AMap reports empty components as `[]` rather than omitting them; those are
/// skipped. The result is cut to the `location_name` column width.
#[must_use]
pub fn place_name_from_response(body: &Value) -> Option<String> {
    if body.get("status").and_then(Value::as_str) != Some("1") {
        return None;
    }

    let components = body.get("regeocode")?.get("addressComponent")?;

    let name: String = ["province", "city", "district", "township"]
        .iter()
        .filter_map(|key| components.get(*key).and_then(Value::as_str))
        .flat_map(str::chars)
        .take(LOCATION_NAME_MAX_LEN)
        .collect();

    if name.is_empty() { None } else { Some(name) }
}
