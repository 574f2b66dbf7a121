//! Crux API Server Entry Point
//!
//! Loads configuration, seeds the store, starts the background tasks and
//! serves HTTP until Ctrl-C.

use crux_api::telemetry::{init_tracer, TelemetryConfig};
use crux_api::{
    create_api_router, load_store, start_background_tasks, ApiConfig, ApiError, ApiResult,
    AppState, SubscriptionTable,
};
use crux_core::EngineConfig;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let api_config = ApiConfig::from_env()?;
    init_tracer(&TelemetryConfig::default().with_json(api_config.log_json))?;

    let engine_config = EngineConfig::from_env();
    engine_config.validate()?;

    let store = load_store(&api_config)?;
    let state = AppState::new(store, engine_config);

    let mut subscriptions = SubscriptionTable::new();
    start_background_tasks(&state, &mut subscriptions).await?;

    let app = create_api_router(state, &api_config);
    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting Crux API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    subscriptions.unsubscribe_all().await;
    served.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("Crux API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
