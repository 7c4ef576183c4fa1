use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiInfo {
    pub message: String,
    pub version: String,
    pub docs: String,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Endpoints {
    pub measurements: String,
    pub systems: String,
    pub weather: String,
    pub analytics: String,
}

/// Health check endpoint
///
/// Not rate-limited; suitable for container probes.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
    })
}

/// API information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ApiInfo),
    ),
    tag = "health"
)]
pub async fn root_info() -> Json<ApiInfo> {
    Json(ApiInfo {
        message: "Photovoltaic monitoring API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: "/docs".to_string(),
        endpoints: Endpoints {
            measurements: "/measurements".to_string(),
            systems: "/systems".to_string(),
            weather: "/weather".to_string(),
            analytics: "/analytics".to_string(),
        },
    })
}
