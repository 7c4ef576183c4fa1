//! Shared harness: the real router on an ephemeral port, backed by a
//! throwaway SQLite file and a mockito stand-in for Open-Meteo.

#![allow(dead_code)]

use std::path::PathBuf;

use mockito::{Matcher, Mock, ServerGuard};
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use uuid::Uuid;

use pv_monitor::common::AppState;
use pv_monitor::config::{Config, Deployment, LogFormat};
use pv_monitor::location::{PlaceResolver, TimezoneResolver};
use pv_monitor::openmeteo::WeatherClient;
use pv_monitor::routes;

pub const FORECAST_PATH: &str = "/v1/forecast";
pub const REGEO_PATH: &str = "/v3/geocode/regeo";
pub const GEOCODER_KEY: &str = "test-key";

pub fn test_config(upstream_url: &str, database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        weather_base_url: format!("{upstream_url}{FORECAST_PATH}"),
        weather_timeout_seconds: 5,
        weather_current_max_age_seconds: 60,
        weather_forecast_max_age_seconds: None,
        weather_forecast_default_days: 2,
        weather_forecast_max_days: 2,
        geocoder_base_url: format!("{upstream_url}{REGEO_PATH}"),
        geocoder_key: None,
        geocoder_timeout_seconds: 5,
        sync_current_interval_seconds: 0,
        sync_forecast_interval_seconds: 0,
        api_host: "127.0.0.1".to_string(),
        api_port: 0,
        measurements_max_limit: 1000,
        disable_rate_limiting: true,
        rate_limit_query_per_second: 5,
        rate_limit_query_burst: 60,
        rate_limit_ingest_per_second: 50,
        rate_limit_ingest_burst: 200,
        bulk_concurrent_limit: 5,
        zone_cache_ttl_seconds: 300,
        zone_cache_max_entries: 1000,
        deployment: Deployment::Local,
        log_format: LogFormat::Pretty,
    }
}

pub struct TestServer {
    port: u16,
    pub db: DatabaseConnection,
    pub client: reqwest::Client,
    pub upstream: ServerGuard,
    db_path: PathBuf,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(adjust: impl FnOnce(&mut Config)) -> Self {
        let upstream = mockito::Server::new_async().await;

        let db_path = std::env::temp_dir().join(format!("pv-monitor-{}.db", Uuid::new_v4()));
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let mut config = test_config(&upstream.url(), &database_url);
        adjust(&mut config);

        let db = Database::connect(&database_url)
            .await
            .expect("Failed to open test database");
        migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let state = AppState::new(
            db.clone(),
            config.clone(),
            WeatherClient::new(&config).expect("Failed to create weather client"),
            PlaceResolver::new(&config).expect("Failed to create place resolver"),
            TimezoneResolver::new(),
        );
        let app = routes::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener.local_addr().expect("No local addr").port();

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server error");
        });

        Self {
            port,
            db,
            client: reqwest::Client::new(),
            upstream,
            db_path,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request")
    }

    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request")
    }

    pub async fn put(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send PUT request")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request")
    }

    /// Register `PV-001` in Shanghai.
    pub async fn create_shanghai_system(&self) -> Value {
        let response = self
            .post(
                "/systems",
                &json!({
                    "system_id": "PV-001",
                    "name": "Rooftop array",
                    "capacity": 10.0,
                    "latitude": 31.23,
                    "longitude": 121.47
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        response.json().await.expect("Invalid system JSON")
    }

    /// Mock the provider's current-conditions call.
    pub async fn mock_current(&mut self, status: usize, hits: usize) -> Mock {
        self.upstream
            .mock("GET", FORECAST_PATH)
            .match_query(Matcher::UrlEncoded(
                "current".into(),
                "shortwave_radiation,cloud_cover,temperature_2m,wind_speed_10m".into(),
            ))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(current_payload().to_string())
            .expect(hits)
            .create_async()
            .await
    }

    /// Mock the provider's hourly forecast call for `days`.
    pub async fn mock_forecast(&mut self, days: u32, hits: usize) -> Mock {
        self.upstream
            .mock("GET", FORECAST_PATH)
            .match_query(Matcher::UrlEncoded("forecast_days".into(), days.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(forecast_payload().to_string())
            .expect(hits)
            .create_async()
            .await
    }

    /// Mock a reverse-geocoding call for `"lon,lat"`.
    pub async fn mock_regeo(
        &mut self,
        location: &str,
        status: usize,
        body: Value,
        hits: usize,
    ) -> Mock {
        self.upstream
            .mock("GET", REGEO_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("location".into(), location.into()),
                Matcher::UrlEncoded("key".into(), GEOCODER_KEY.into()),
            ]))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(hits)
            .create_async()
            .await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

pub fn current_payload() -> Value {
    json!({
        "latitude": 31.25,
        "longitude": 121.5,
        "timezone": "Asia/Shanghai",
        "current_units": {"shortwave_radiation": "W/m²"},
        "current": {
            "time": "2026-03-01T12:00",
            "interval": 900,
            "shortwave_radiation": 612.0,
            "cloud_cover": 20,
            "temperature_2m": 14.3,
            "wind_speed_10m": 3.1
        }
    })
}

pub fn forecast_payload() -> Value {
    json!({
        "latitude": 31.25,
        "longitude": 121.5,
        "timezone": "Asia/Shanghai",
        "hourly": {
            "time": ["2026-03-01T00:00", "2026-03-01T01:00"],
            "shortwave_radiation": [0.0, 0.0],
            "cloud_cover": [80, 75],
            "temperature_2m": [8.1, 7.9],
            "wind_speed_10m": [2.0, 2.2]
        }
    })
}

pub fn regeo_payload() -> Value {
    json!({
        "status": "1",
        "info": "OK",
        "regeocode": {
            "formatted_address": "上海市黄浦区外滩街道中山东一路",
            "addressComponent": {
                "province": "上海市",
                "city": [],
                "district": "黄浦区",
                "township": "外滩街道"
            }
        }
    })
}
