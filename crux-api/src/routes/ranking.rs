//! Ranking REST API Routes
//!
//! The persisted leaderboard, a freshly computed one, and a manual run.

use axum::{extract::State, response::IntoResponse, routing::{get, post}, Json, Router};
use crux_core::RankedStanding;
use crux_engine::{leaderboard, LeaderboardEntry, RankingReport};

use crate::{error::{ApiError, ApiResult}, state::AppState};

/// GET /ranking - Leaderboard as of the last committed run
#[utoipa::path(
    get,
    path = "/ranking",
    tag = "Ranking",
    responses(
        (status = 200, description = "Persisted standings ordered by position", body = Vec<LeaderboardEntry>),
        (status = 503, description = "Store unavailable", body = ApiError),
    ),
)]
pub async fn get_leaderboard(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let entries = leaderboard(&state.store).await?;
    Ok(Json(entries))
}

/// GET /ranking/live - Ranking computed now from current logs, not persisted
#[utoipa::path(
    get,
    path = "/ranking/live",
    tag = "Ranking",
    responses(
        (status = 200, description = "Freshly computed standings", body = Vec<RankedStanding>),
        (status = 422, description = "A stored record could not be scored", body = ApiError),
        (status = 503, description = "Store unavailable", body = ApiError),
    ),
)]
pub async fn get_live_ranking(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let standings = state.query.current_ranking().await?;
    Ok(Json(standings))
}

/// POST /ranking/run - Run and commit a ranking pass immediately
#[utoipa::path(
    post,
    path = "/ranking/run",
    tag = "Ranking",
    responses(
        (status = 200, description = "Run committed", body = RankingReport),
        (status = 409, description = "Commit kept conflicting", body = ApiError),
        (status = 500, description = "Run failed, previous ranking kept", body = ApiError),
    ),
)]
pub async fn run_ranking(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let report = state.engine.run().await?;
    tracing::info!(
        run_id = %report.run_id,
        ranked = report.ranked,
        gaps = report.gaps.len(),
        "Manual ranking run committed"
    );
    Ok(Json(report))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_leaderboard))
        .route("/live", get(get_live_ranking))
        .route("/run", post(run_ranking))
}
