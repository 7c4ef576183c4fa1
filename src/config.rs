use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Open-Meteo
    pub weather_base_url: String,
    pub weather_timeout_seconds: u64,
    pub weather_current_max_age_seconds: u64,
    /// None reuses the latest forecast snapshot regardless of age
    pub weather_forecast_max_age_seconds: Option<u64>,
    pub weather_forecast_default_days: u32,
    pub weather_forecast_max_days: u32,

    // Reverse geocoding (AMap)
    pub geocoder_base_url: String,
    pub geocoder_key: Option<String>,
    pub geocoder_timeout_seconds: u64,

    // Weather refresh (0 disables the in-process task)
    pub sync_current_interval_seconds: u64,
    pub sync_forecast_interval_seconds: u64,

    // API settings
    pub api_host: String,
    pub api_port: u16,
    pub measurements_max_limit: u64,

    // Rate limiting
    pub disable_rate_limiting: bool,
    pub rate_limit_query_per_second: u64,
    pub rate_limit_query_burst: u32,
    pub rate_limit_ingest_per_second: u64,
    pub rate_limit_ingest_burst: u32,
    pub bulk_concurrent_limit: usize,

    // Timezone lookup cache
    pub zone_cache_ttl_seconds: u64,
    pub zone_cache_max_entries: u64,

    // Application metadata
    pub deployment: Deployment,
    pub log_format: LogFormat,
}

/// Parse an optional env var, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if required environment variables are not set,
    /// or `ConfigError::Invalid` if a value is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,

            // Open-Meteo
            weather_base_url: env::var("WEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1/forecast".to_string()),
            weather_timeout_seconds: env_or("WEATHER_TIMEOUT_SECONDS", 10),
            weather_current_max_age_seconds: env_or("WEATHER_CURRENT_MAX_AGE_SECONDS", 60),
            weather_forecast_max_age_seconds: env::var("WEATHER_FORECAST_MAX_AGE_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok()),
            weather_forecast_default_days: env_or("WEATHER_FORECAST_DEFAULT_DAYS", 2),
            weather_forecast_max_days: env_or("WEATHER_FORECAST_MAX_DAYS", 2),

            // Reverse geocoding
            geocoder_base_url: env::var("AMAP_BASE_URL")
                .unwrap_or_else(|_| "https://restapi.amap.com/v3/geocode/regeo".to_string()),
            geocoder_key: env::var("AMAP_KEY").ok().filter(|k| !k.trim().is_empty()),
            geocoder_timeout_seconds: env_or("AMAP_TIMEOUT_SECONDS", 5),

            // Weather refresh
            sync_current_interval_seconds: env_or("SYNC_CURRENT_INTERVAL_SECONDS", 0),
            sync_forecast_interval_seconds: env_or("SYNC_FORECAST_INTERVAL_SECONDS", 0),

            // API settings
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env_or("API_PORT", 8000),
            measurements_max_limit: env_or("MEASUREMENTS_MAX_LIMIT", 1000),

            // Rate limiting
            disable_rate_limiting: env_or("DISABLE_RATE_LIMITING", false),
            rate_limit_query_per_second: env_or("RATE_LIMIT_QUERY_PER_SECOND", 5),
            rate_limit_query_burst: env_or("RATE_LIMIT_QUERY_BURST", 60),
            rate_limit_ingest_per_second: env_or("RATE_LIMIT_INGEST_PER_SECOND", 50),
            rate_limit_ingest_burst: env_or("RATE_LIMIT_INGEST_BURST", 200),
            bulk_concurrent_limit: env_or("BULK_CONCURRENT_LIMIT", 5),

            // Timezone lookup cache
            zone_cache_ttl_seconds: env_or("ZONE_CACHE_TTL_SECONDS", 300),
            zone_cache_max_entries: env_or("ZONE_CACHE_MAX_ENTRIES", 10_000),

            // Application metadata
            deployment: Deployment::from_str(
                &env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            ),
            log_format: LogFormat::from_str(
                &env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let timeouts = [
            ("WEATHER_TIMEOUT_SECONDS", self.weather_timeout_seconds),
            ("AMAP_TIMEOUT_SECONDS", self.geocoder_timeout_seconds),
        ];
        if let Some((name, _)) = timeouts.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(name, "must be at least 1".to_string()));
        }
        if self.weather_forecast_max_days == 0 {
            return Err(ConfigError::Invalid(
                "WEATHER_FORECAST_MAX_DAYS",
                "must be at least 1".to_string(),
            ));
        }
        if !(1..=self.weather_forecast_max_days).contains(&self.weather_forecast_default_days) {
            return Err(ConfigError::Invalid(
                "WEATHER_FORECAST_DEFAULT_DAYS",
                format!("must be within 1..={}", self.weather_forecast_max_days),
            ));
        }
        if self.measurements_max_limit == 0 {
            return Err(ConfigError::Invalid(
                "MEASUREMENTS_MAX_LIMIT",
                "must be at least 1".to_string(),
            ));
        }
        if !self.disable_rate_limiting {
            let quotas = [
                ("RATE_LIMIT_QUERY_PER_SECOND", self.rate_limit_query_per_second),
                ("RATE_LIMIT_QUERY_BURST", u64::from(self.rate_limit_query_burst)),
                ("RATE_LIMIT_INGEST_PER_SECOND", self.rate_limit_ingest_per_second),
                ("RATE_LIMIT_INGEST_BURST", u64::from(self.rate_limit_ingest_burst)),
            ];
            if let Some((name, _)) = quotas.into_iter().find(|(_, value)| *value == 0) {
                return Err(ConfigError::Invalid(name, "must be at least 1".to_string()));
            }
        }
        if self.bulk_concurrent_limit == 0 {
            return Err(ConfigError::Invalid(
                "BULK_CONCURRENT_LIMIT",
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
