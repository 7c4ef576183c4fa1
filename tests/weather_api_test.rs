//! Weather cache endpoints against a mocked Open-Meteo.
//!
//! Run with: cargo test --test weather_api_test

mod common;

use std::io::Write;
use std::time::Duration;

use common::{TestServer, FORECAST_PATH};
use mockito::Matcher;
use pv_monitor::entity::{weather_current, weather_forecast};
use pv_monitor::openmeteo::WeatherClient;
use pv_monitor::sync::{worker, RefreshKind};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::{json, Value};

#[tokio::test]
async fn forecast_without_snapshot_fetches_once() {
    let mut server = TestServer::start().await;
    server.create_shanghai_system().await;
    let mock = server.mock_forecast(2, 1).await;

    let first = server.get("/weather/forecast?system_id=PV-001&days=2").await;
    assert_eq!(first.status(), 200);
    let body: Value = first.json().await.unwrap();
    assert_eq!(body["system_id"], "PV-001");
    assert_eq!(body["days"], 2);
    assert_eq!(body["hourly"]["cloud_cover"], json!([80, 75]));

    // Unset forecast max age: the stored snapshot is reused
    let second = server.get("/weather/forecast?system_id=PV-001&days=2").await;
    assert_eq!(second.status(), 200);

    mock.assert_async().await;
    assert_eq!(weather_forecast::Entity::find().count(&server.db).await.unwrap(), 1);
}

#[tokio::test]
async fn forecast_days_default_and_bounds() {
    let mut server = TestServer::start().await;
    server.create_shanghai_system().await;
    let mock = server.mock_forecast(2, 1).await;

    let defaulted: Value = server
        .get("/weather/forecast?system_id=PV-001")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(defaulted["days"], 2);
    mock.assert_async().await;

    assert_eq!(
        server.get("/weather/forecast?system_id=PV-001&days=3").await.status(),
        422
    );
    assert_eq!(
        server.get("/weather/forecast?system_id=PV-001&days=0").await.status(),
        422
    );
}

#[tokio::test]
async fn current_is_reused_while_fresh() {
    let mut server = TestServer::start().await;
    server.create_shanghai_system().await;
    let mock = server.mock_current(200, 1).await;

    for _ in 0..2 {
        let body: Value = server
            .get("/weather/current?system_id=PV-001")
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(body["shortwave_radiation"], 612.0);
        assert_eq!(body["cloud_cover"], 20.0);
        assert_eq!(body["wind_speed_10m"], 3.1);
    }

    mock.assert_async().await;
    assert_eq!(weather_current::Entity::find().count(&server.db).await.unwrap(), 1);
}

#[tokio::test]
async fn zero_max_age_refetches_current() {
    let mut server = TestServer::start_with(|c| c.weather_current_max_age_seconds = 0).await;
    server.create_shanghai_system().await;
    let mock = server.mock_current(200, 2).await;

    server.get("/weather/current?system_id=PV-001").await;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    server.get("/weather/current?system_id=PV-001").await;

    mock.assert_async().await;
    assert_eq!(weather_current::Entity::find().count(&server.db).await.unwrap(), 2);
}

#[tokio::test]
async fn upstream_request_carries_location_and_units() {
    let mut server = TestServer::start().await;
    server.create_shanghai_system().await;

    let mock = server
        .upstream
        .mock("GET", FORECAST_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("latitude".into(), "31.23".into()),
            Matcher::UrlEncoded("longitude".into(), "121.47".into()),
            Matcher::UrlEncoded("timezone".into(), "Asia/Shanghai".into()),
            Matcher::UrlEncoded("wind_speed_unit".into(), "ms".into()),
        ]))
        .with_status(200)
        .with_body(common::current_payload().to_string())
        .expect(1)
        .create_async()
        .await;

    assert_eq!(server.get("/weather/current?system_id=PV-001").await.status(), 200);
    mock.assert_async().await;
}

#[tokio::test]
async fn cached_reads_are_stable_and_never_fetch() {
    let mut server = TestServer::start().await;
    server.create_shanghai_system().await;

    assert_eq!(
        server.get("/weather/current_cached?system_id=PV-001").await.status(),
        404
    );

    let mock = server.mock_current(200, 1).await;
    server.get("/weather/current?system_id=PV-001").await;

    let first = server
        .get("/weather/current_cached?system_id=PV-001")
        .await
        .bytes()
        .await
        .unwrap();
    let second = server
        .get("/weather/current_cached?system_id=PV-001")
        .await
        .bytes()
        .await
        .unwrap();
    assert_eq!(first, second);

    mock.assert_async().await;

    assert_eq!(
        server
            .get("/weather/forecast_cached?system_id=PV-001&days=2")
            .await
            .status(),
        404
    );
}

#[tokio::test]
async fn upstream_failure_is_502_and_stores_nothing() {
    let mut server = TestServer::start().await;
    server.create_shanghai_system().await;
    let _mock = server.mock_current(500, 1).await;

    let response = server.get("/weather/current?system_id=PV-001").await;
    assert_eq!(response.status(), 502);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["code"], "upstream_error");

    assert_eq!(weather_current::Entity::find().count(&server.db).await.unwrap(), 0);
}

#[tokio::test]
async fn upstream_timeout_is_502_and_stores_nothing() {
    let mut server = TestServer::start_with(|c| c.weather_timeout_seconds = 1).await;
    server.create_shanghai_system().await;

    let _mock = server
        .upstream
        .mock("GET", FORECAST_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_secs(3));
            w.write_all(common::current_payload().to_string().as_bytes())
        })
        .create_async()
        .await;

    let response = server.get("/weather/current?system_id=PV-001").await;
    assert_eq!(response.status(), 502);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["code"], "upstream_error");

    assert_eq!(weather_current::Entity::find().count(&server.db).await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_or_unlocated_system_is_404() {
    let server = TestServer::start().await;

    assert_eq!(server.get("/weather/current?system_id=NOPE").await.status(), 404);

    server
        .post("/systems", &json!({"system_id": "PV-009", "name": "Nowhere"}))
        .await;
    assert_eq!(server.get("/weather/current?system_id=PV-009").await.status(), 404);
}

#[tokio::test]
async fn measured_radiation_is_oldest_first_with_local_time() {
    let server = TestServer::start().await;
    server.create_shanghai_system().await;

    for (stamp, irradiance) in [
        ("2026-03-01T05:00:00Z", json!(650.0)),
        ("2026-03-01T04:00:00Z", json!(600.0)),
        ("2026-03-01T06:00:00Z", Value::Null),
    ] {
        server
            .post(
                "/measurements",
                &json!({"system_id": "PV-001", "timestamp": stamp, "irradiance": irradiance}),
            )
            .await;
    }

    let points: Vec<Value> = server
        .get("/weather/measured_radiation?system_id=PV-001&end_time=2026-03-01T05:30:00Z")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["timestamp"], "2026-03-01T04:00:00Z");
    assert_eq!(points[0]["irradiance"], 600.0);
    assert_eq!(points[0]["local_time"], "2026-03-01T12:00:00+08:00");
    assert_eq!(points[1]["irradiance"], 650.0);
}

#[tokio::test]
async fn window_larger_than_cap_is_rejected_not_truncated() {
    let server = TestServer::start_with(|c| c.measurements_max_limit = 2).await;
    server.create_shanghai_system().await;

    for hour in 1..=3 {
        server
            .post(
                "/measurements",
                &json!({
                    "system_id": "PV-001",
                    "timestamp": format!("2026-03-01T0{hour}:00:00Z"),
                    "irradiance": 500.0
                }),
            )
            .await;
    }

    let whole_day = "system_id=PV-001&start_time=2026-03-01T00:00:00Z&end_time=2026-03-01T23:00:00Z";
    for path in ["/weather/measured_radiation", "/analytics/anomalies"] {
        let response = server.get(&format!("{path}?{whole_day}")).await;
        assert_eq!(response.status(), 422, "{path}");
        let error: Value = response.json().await.unwrap();
        assert_eq!(error["code"], "validation_error");
    }

    // A window that fits comes back whole, newest row included
    let points: Vec<Value> = server
        .get("/weather/measured_radiation?system_id=PV-001&start_time=2026-03-01T02:00:00Z")
        .await
        .json()
        .await
        .unwrap();
    let stamps: Vec<&str> = points.iter().map(|p| p["timestamp"].as_str().unwrap()).collect();
    assert_eq!(stamps, ["2026-03-01T02:00:00Z", "2026-03-01T03:00:00Z"]);

    let report: Value = server
        .get("/analytics/anomalies?system_id=PV-001&start_time=2026-03-01T02:00:00Z")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(report["checked"], 2);
}

#[tokio::test]
async fn refresh_pass_skips_unlocated_and_continues() {
    let mut server = TestServer::start().await;
    server.create_shanghai_system().await;
    server
        .post("/systems", &json!({"system_id": "PV-009", "name": "Nowhere"}))
        .await;
    server
        .post(
            "/systems",
            &json!({"system_id": "PV-010", "name": "Off", "latitude": 1.0, "longitude": 1.0, "is_active": false}),
        )
        .await;

    let current = server.mock_current(200, 1).await;
    let forecast = server.mock_forecast(2, 1).await;

    let config = common::test_config(&server.upstream.url(), "sqlite::memory:");
    let client = WeatherClient::new(&config).unwrap();
    let summary = worker::refresh(&server.db, &client, RefreshKind::All, 2)
        .await
        .unwrap();

    assert_eq!(summary.refreshed, 2);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.failed, 0);
    current.assert_async().await;
    forecast.assert_async().await;
}
