//! Diagnostics endpoint

use axum::{extract::State, response::IntoResponse, Json};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    types::StatsResponse,
};

/// GET /stats - Store record counts and engine counters
#[utoipa::path(
    get,
    path = "/stats",
    tag = "Observability",
    responses(
        (status = 200, description = "Current statistics", body = StatsResponse),
        (status = 500, description = "Store statistics unavailable", body = ApiError),
    ),
)]
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let store = state.store.statistics().await?;
    Ok(Json(StatsResponse {
        store,
        engine: state.metrics.snapshot(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    }))
}
