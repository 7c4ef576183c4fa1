use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::openmeteo::models::{WeatherLocation, WEATHER_VARIABLES};

/// Open-Meteo forecast API client.
///
/// One instance is built at startup and shared through `AppState`; requests are
/// never retried.
pub struct WeatherClient {
    http_client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl WeatherClient {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.weather_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.weather_base_url.clone(),
            timeout_secs: config.weather_timeout_seconds,
        })
    }

    /// Fetch current conditions for a location.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` on timeout, transport failure, non-2xx status
    /// or an unparseable body.
    pub async fn fetch_current(&self, location: &WeatherLocation) -> AppResult<Value> {
        let params = [
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("current", WEATHER_VARIABLES.to_string()),
            ("timezone", location.timezone_param().to_string()),
            ("wind_speed_unit", "ms".to_string()),
        ];

        self.get(&params).await
    }

    /// Fetch an hourly forecast covering `days` days.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` on timeout, transport failure, non-2xx status
    /// or an unparseable body.
    pub async fn fetch_forecast(&self, location: &WeatherLocation, days: u32) -> AppResult<Value> {
        let params = [
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("hourly", WEATHER_VARIABLES.to_string()),
            ("timezone", location.timezone_param().to_string()),
            ("forecast_days", days.to_string()),
            ("wind_speed_unit", "ms".to_string()),
        ];

        self.get(&params).await
    }

    async fn get(&self, params: &[(&str, String)]) -> AppResult<Value> {
        let response = self
            .http_client
            .get(&self.base_url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Upstream(format!("Request timed out after {}s", self.timeout_secs))
                } else {
                    AppError::Upstream(format!("Request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to get response text: {e}")))?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body_preview = %text.chars().take(500).collect::<String>(),
                "Failed to parse Open-Meteo response"
            );
            AppError::Upstream(format!("Failed to parse response: {e}"))
        })
    }
}
