pub mod analytics;
pub mod device;
pub mod extract;
pub mod health;
pub mod measurements;
pub mod params;
mod rate_limit;
pub mod systems;
pub mod weather;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use rate_limit::FallbackIpKeyExtractor;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::root_info,
        health::health_check,
        device::ingest_from_device,
        measurements::create_measurement,
        measurements::create_measurements_batch,
        measurements::list_measurements,
        measurements::get_measurement,
        measurements::delete_measurement,
        systems::create_system,
        systems::list_systems,
        systems::get_system,
        systems::update_system,
        systems::delete_system,
        weather::get_current_weather,
        weather::get_weather_forecast,
        weather::get_current_weather_cached,
        weather::get_weather_forecast_cached,
        weather::get_measured_radiation,
        analytics::get_anomalies,
        analytics::get_daily_energy,
        analytics::get_efficiency,
    ),
    components(
        schemas(
            health::HealthResponse,
            health::ApiInfo,
            health::Endpoints,
            measurements::CreateMeasurementRequest,
            measurements::MeasurementBatchRequest,
            measurements::MeasurementResponse,
            systems::CreateSystemRequest,
            systems::UpdateSystemRequest,
            systems::SystemResponse,
            weather::CurrentWeatherResponse,
            weather::ForecastResponse,
            weather::MeasuredRadiationPoint,
            analytics::AnomaliesResponse,
            analytics::DailyEnergyResponse,
            analytics::EfficiencyResponse,
            crate::performance::Anomaly,
        )
    ),
    tags(
        (name = "health", description = "Service information and health checks"),
        (name = "measurements", description = "Sensor measurement ingestion and retrieval"),
        (name = "systems", description = "Installation configuration"),
        (name = "weather", description = "Open-Meteo weather snapshots and measured radiation"),
        (name = "analytics", description = "Performance calculations over stored data"),
    ),
    info(
        title = "PV Monitor API",
        description = "Photovoltaic measurement ingestion and weather comparison API",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    if config.disable_rate_limiting {
        tracing::warn!("Rate limiting DISABLED");
    } else {
        tracing::info!(
            query_rate = %format!("{}/s burst {}", config.rate_limit_query_per_second, config.rate_limit_query_burst),
            ingest_rate = %format!("{}/s burst {}", config.rate_limit_ingest_per_second, config.rate_limit_ingest_burst),
            bulk_concurrent = config.bulk_concurrent_limit,
            "Rate limiting configured"
        );
    }

    // Writes from loggers and clients
    let ingest_routes_base = Router::new()
        .route("/", post(device::ingest_from_device))
        .route("/measurements", post(measurements::create_measurement))
        .route("/measurements/batch", post(measurements::create_measurements_batch));

    let query_routes_base = Router::new()
        .route("/measurements", get(measurements::list_measurements))
        .route(
            "/measurements/{id}",
            get(measurements::get_measurement).delete(measurements::delete_measurement),
        )
        .route(
            "/systems",
            get(systems::list_systems).post(systems::create_system),
        )
        .route(
            "/systems/{system_id}",
            get(systems::get_system)
                .put(systems::update_system)
                .delete(systems::delete_system),
        )
        .route("/weather/current", get(weather::get_current_weather))
        .route("/weather/forecast", get(weather::get_weather_forecast))
        .route("/weather/current_cached", get(weather::get_current_weather_cached))
        .route("/weather/forecast_cached", get(weather::get_weather_forecast_cached))
        .route("/weather/measured_radiation", get(weather::get_measured_radiation))
        .route("/analytics/anomalies", get(analytics::get_anomalies))
        .route("/analytics/daily_energy", get(analytics::get_daily_energy))
        .route("/analytics/efficiency", get(analytics::get_efficiency));

    // Combine API routes, conditionally applying rate limiting
    let api_routes = if config.disable_rate_limiting {
        Router::new()
            .merge(ingest_routes_base)
            .merge(query_routes_base)
    } else {
        let ingest_limiter = GovernorConfigBuilder::default()
            .key_extractor(FallbackIpKeyExtractor)
            .per_second(config.rate_limit_ingest_per_second)
            .burst_size(config.rate_limit_ingest_burst)
            .finish()
            .expect("Failed to create ingest rate limiter");

        let query_limiter = GovernorConfigBuilder::default()
            .key_extractor(FallbackIpKeyExtractor)
            .per_second(config.rate_limit_query_per_second)
            .burst_size(config.rate_limit_query_burst)
            .finish()
            .expect("Failed to create query rate limiter");

        Router::new()
            .merge(ingest_routes_base.layer(GovernorLayer {
                config: Arc::new(ingest_limiter),
            }))
            .merge(query_routes_base.layer(GovernorLayer {
                config: Arc::new(query_limiter),
            }))
    }
    .layer(RequestBodyLimitLayer::new(4 * 1024 * 1024)); // 4MB, room for large batches

    // Info and health (NO rate limiting)
    let health_routes = Router::new()
        .route("/", get(health::root_info))
        .route("/health", get(health::health_check));

    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route_group() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/",
            "/health",
            "/measurements",
            "/measurements/batch",
            "/measurements/{id}",
            "/systems",
            "/systems/{system_id}",
            "/weather/current",
            "/weather/forecast_cached",
            "/weather/measured_radiation",
            "/analytics/anomalies",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }
}
