//! Climber REST API Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use crux_core::{ClimberId, User};
use crux_engine::{route_overlay, RouteOverlay};
use crux_storage::{retry_on_conflict, Transaction};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    types::RegisterClimberRequest,
};

/// GET /climbers/{climber_id} - A climber's profile and persisted standing
#[utoipa::path(
    get,
    path = "/climbers/{climber_id}",
    tag = "Climbers",
    params(("climber_id" = String, Path, description = "Climber ID")),
    responses(
        (status = 200, description = "Climber found", body = User),
        (status = 404, description = "Climber not found", body = ApiError),
    ),
)]
pub async fn get_climber(
    State(state): State<AppState>,
    Path(climber_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let climber_id = ClimberId::new(climber_id);
    let user = state
        .store
        .user_get(&climber_id)
        .await?
        .ok_or_else(|| ApiError::climber_not_found(&climber_id))?;
    Ok(Json(user))
}

/// PUT /climbers/{climber_id} - Register a climber or change their display name
///
/// Points and climbed count are left to the ranking engine. A new climber
/// sits in the last leaderboard slot until the next run.
#[utoipa::path(
    put,
    path = "/climbers/{climber_id}",
    tag = "Climbers",
    params(("climber_id" = String, Path, description = "Climber ID")),
    request_body = RegisterClimberRequest,
    responses(
        (status = 201, description = "Climber registered", body = User),
        (status = 200, description = "Climber renamed", body = User),
        (status = 400, description = "Invalid request", body = ApiError),
    ),
)]
pub async fn put_climber(
    State(state): State<AppState>,
    Path(climber_id): Path<String>,
    Json(req): Json<RegisterClimberRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.name.trim().is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    let climber_id = ClimberId::new(climber_id);

    let store = &state.store;
    let name = req.name.trim();
    let created = retry_on_conflict(&state.engine.config().retry, || {
        let climber_id = climber_id.clone();
        async move {
            let mut tx = Transaction::new();
            let existing = store.tx_user_get(&mut tx, &climber_id).await?;
            tx.rename_user(climber_id, name);
            store.commit(tx).await?;
            Ok(existing.is_none())
        }
    })
    .await?;

    let user = state
        .store
        .user_get(&climber_id)
        .await?
        .ok_or_else(|| ApiError::climber_not_found(&climber_id))?;
    tracing::info!(climber_id = %user.climber_id, created, "Climber profile stored");

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(user)))
}

/// GET /climbers/{climber_id}/routes - Every route with the climber's log overlaid
#[utoipa::path(
    get,
    path = "/climbers/{climber_id}/routes",
    tag = "Climbers",
    params(("climber_id" = String, Path, description = "Climber ID")),
    responses(
        (status = 200, description = "Routes with style and lock status", body = Vec<RouteOverlay>),
        (status = 503, description = "Store unavailable", body = ApiError),
    ),
)]
pub async fn get_route_overlay(
    State(state): State<AppState>,
    Path(climber_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let overlay = route_overlay(&state.store, &ClimberId::new(climber_id)).await?;
    Ok(Json(overlay))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/:climber_id", get(get_climber).put(put_climber))
        .route("/:climber_id/routes", get(get_route_overlay))
}
