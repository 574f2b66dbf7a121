//! Route REST API Routes
//!
//! Route management plus the per-climber log writes nested under a route.
//! Log writes only touch the log; the completion count follows through the
//! log change feed, or immediately via the recount endpoint.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use crux_core::{ClimberId, Log, LogKey, Route, RouteId};
use crux_engine::RecountOutcome;
use crux_storage::{LogChangeKind, RouteUpsert};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    types::{LogWriteResponse, PutLogRequest, UpdateRouteRequest},
};

// ============================================================================
// ROUTES
// ============================================================================

/// GET /routes - List every route with its current completion count
#[utoipa::path(
    get,
    path = "/routes",
    tag = "Routes",
    responses(
        (status = 200, description = "All routes", body = Vec<Route>),
    ),
)]
pub async fn list_routes(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.store.route_list().await?))
}

/// POST /routes - Create a route with a fresh id
#[utoipa::path(
    post,
    path = "/routes",
    tag = "Routes",
    request_body = UpdateRouteRequest,
    responses(
        (status = 201, description = "Route created", body = Route),
        (status = 400, description = "Invalid request", body = ApiError),
    ),
)]
pub async fn create_route(
    State(state): State<AppState>,
    Json(req): Json<UpdateRouteRequest>,
) -> ApiResult<impl IntoResponse> {
    let route = state
        .store
        .route_upsert(RouteUpsert {
            route_id: None,
            name: req.name,
            points: req.points,
        })
        .await?;
    tracing::info!(route_id = %route.route_id, points = route.points, "Route created");
    Ok((StatusCode::CREATED, Json(route)))
}

/// GET /routes/{route_id} - Fetch one route
#[utoipa::path(
    get,
    path = "/routes/{route_id}",
    tag = "Routes",
    params(("route_id" = String, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Route found", body = Route),
        (status = 404, description = "Route not found", body = ApiError),
    ),
)]
pub async fn get_route(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let route_id = RouteId::new(route_id);
    let route = state
        .store
        .route_get(&route_id)
        .await?
        .ok_or_else(|| ApiError::route_not_found(&route_id))?;
    Ok(Json(route))
}

/// PUT /routes/{route_id} - Create or replace a route, keeping its completion count
#[utoipa::path(
    put,
    path = "/routes/{route_id}",
    tag = "Routes",
    params(("route_id" = String, Path, description = "Route ID")),
    request_body = UpdateRouteRequest,
    responses(
        (status = 200, description = "Route stored", body = Route),
        (status = 400, description = "Invalid request", body = ApiError),
    ),
)]
pub async fn put_route(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
    Json(req): Json<UpdateRouteRequest>,
) -> ApiResult<impl IntoResponse> {
    if route_id.trim().is_empty() {
        return Err(ApiError::missing_field("route_id"));
    }
    let route = state
        .store
        .route_upsert(RouteUpsert {
            route_id: Some(RouteId::new(route_id)),
            name: req.name,
            points: req.points,
        })
        .await?;
    tracing::info!(route_id = %route.route_id, points = route.points, "Route stored");
    Ok(Json(route))
}

/// POST /routes/{route_id}/recount - Recount completions now
#[utoipa::path(
    post,
    path = "/routes/{route_id}/recount",
    tag = "Routes",
    params(("route_id" = String, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Recount committed", body = RecountOutcome),
        (status = 404, description = "Route not found", body = ApiError),
        (status = 409, description = "Recount kept conflicting", body = ApiError),
    ),
)]
pub async fn recount_route(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.counter.recount_route(&RouteId::new(route_id)).await?;
    Ok(Json(outcome))
}

// ============================================================================
// LOGS
// ============================================================================

/// PUT /routes/{route_id}/logs/{climber_id} - Create or overwrite a climber's log
#[utoipa::path(
    put,
    path = "/routes/{route_id}/logs/{climber_id}",
    tag = "Logs",
    params(
        ("route_id" = String, Path, description = "Route ID"),
        ("climber_id" = String, Path, description = "Climber ID"),
    ),
    request_body = PutLogRequest,
    responses(
        (status = 201, description = "Log created", body = LogWriteResponse),
        (status = 200, description = "Log overwritten", body = LogWriteResponse),
        (status = 404, description = "Route not found", body = ApiError),
    ),
)]
pub async fn put_log(
    State(state): State<AppState>,
    Path((route_id, climber_id)): Path<(String, String)>,
    Json(req): Json<PutLogRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut log = Log::new(RouteId::new(route_id), ClimberId::new(climber_id), req.style);
    log.lock_status = req.lock_status;

    let change = state.store.log_put(&log).await?;
    tracing::debug!(
        route_id = %log.route_id,
        climber_id = %log.climber_id,
        style = %log.style,
        %change,
        "Log written"
    );

    let status = if change == LogChangeKind::Created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(LogWriteResponse {
            route_id: log.route_id,
            climber_id: log.climber_id,
            change,
        }),
    ))
}

/// DELETE /routes/{route_id}/logs/{climber_id} - Delete a climber's log
#[utoipa::path(
    delete,
    path = "/routes/{route_id}/logs/{climber_id}",
    tag = "Logs",
    params(
        ("route_id" = String, Path, description = "Route ID"),
        ("climber_id" = String, Path, description = "Climber ID"),
    ),
    responses(
        (status = 204, description = "Log deleted"),
        (status = 404, description = "No such log", body = ApiError),
    ),
)]
pub async fn delete_log(
    State(state): State<AppState>,
    Path((route_id, climber_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let key = LogKey::new(RouteId::new(route_id), ClimberId::new(climber_id));
    if !state.store.log_delete(&key).await? {
        return Err(ApiError::log_not_found(&key.route_id, &key.climber_id));
    }
    tracing::debug!(route_id = %key.route_id, climber_id = %key.climber_id, "Log deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_routes).post(create_route))
        .route("/:route_id", get(get_route).put(put_route))
        .route("/:route_id/recount", post(recount_route))
        .route("/:route_id/logs/:climber_id", put(put_log).delete(delete_log))
}
