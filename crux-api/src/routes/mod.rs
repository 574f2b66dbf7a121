//! REST API Routes Module
//!
//! Route handlers grouped by resource, plus the router builder that puts
//! CORS, request timeouts and observability around them.

pub mod climber;
pub mod health;
pub mod ranking;
pub mod route;
pub mod stats;

use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::from_fn,
    response::IntoResponse,
    routing::get,
    BoxError, Json, Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::error::{ApiError, ErrorCode};
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use climber::create_router as climber_router;
pub use health::create_router as health_router;
pub use ranking::create_router as ranking_router;
pub use route::create_router as route_router;

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Turn tower middleware failures (timeouts) into `ApiError` bodies.
async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::new(ErrorCode::ServiceUnavailable, "Request timed out")
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        ApiError::from_code(ErrorCode::InternalError)
    }
}

/// Build the complete router.
///
/// Execution order: CORS -> Observability -> Timeout -> Handler
pub fn create_api_router(state: AppState, config: &ApiConfig) -> Router {
    let mut router = Router::new()
        .nest("/health", health::create_router())
        .nest("/ranking", ranking::create_router())
        .nest("/routes", route::create_router())
        .nest("/climbers", climber::create_router())
        .route("/stats", get(stats::get_stats))
        .route("/metrics", get(metrics_handler))
        .route("/openapi.json", get(openapi_json));

    #[cfg(feature = "swagger-ui")]
    {
        use utoipa_swagger_ui::SwaggerUi;
        router = router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()));
    }

    let timeout = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .timeout(Duration::from_secs(config.request_timeout_secs));

    router
        .layer(timeout)
        .layer(from_fn(observability_middleware))
        .layer(build_cors_layer(config))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(ErrorCode::EntityNotFound, "No such endpoint")),
    )
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Empty origin list allows any origin (development); otherwise only the
/// configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: restricted origins");
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(%origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        cors.allow_origin(origins)
    }
}
