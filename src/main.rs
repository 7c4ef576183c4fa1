use std::net::SocketAddr;

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tokio::signal;

use pv_monitor::common::AppState;
use pv_monitor::config::Config;
use pv_monitor::location::{PlaceResolver, TimezoneResolver};
use pv_monitor::openmeteo::WeatherClient;
use pv_monitor::routes;
use pv_monitor::sync;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (fail-fast)
    let config = Config::from_env()?;
    pv_monitor::init_tracing(config.log_format);

    tracing::info!(
        deployment = ?config.deployment,
        host = %config.api_host,
        port = config.api_port,
        "Configuration loaded"
    );

    // Connect to database (fail-fast)
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;
    tracing::info!("Database connection established");

    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Migrations completed");

    let weather_client = WeatherClient::new(&config)?;
    let place_resolver = PlaceResolver::new(&config)?;
    let timezone_resolver = TimezoneResolver::new();
    tracing::info!(
        weather_base_url = %config.weather_base_url,
        reverse_geocoding = place_resolver.is_enabled(),
        "Clients initialized"
    );

    let state = AppState::new(
        db,
        config.clone(),
        weather_client,
        place_resolver,
        timezone_resolver,
    );

    // Background weather refresh (fire-and-forget, non-blocking)
    let tasks = sync::scheduler::spawn_enabled(&state);
    tracing::debug!(tasks, "Background refresh tasks spawned");

    let app = routes::build_router(state);

    // Start server with graceful shutdown
    let addr = config.bind_address();
    tracing::info!(address = %addr, "Starting server");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}
