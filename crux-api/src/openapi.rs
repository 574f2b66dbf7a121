//! OpenAPI document for the Crux API, generated with utoipa from the
//! handler annotations and record types.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::{climber, health, ranking, route, stats};
use crate::telemetry::metrics;
use crate::types::{
    LogWriteResponse, PutLogRequest, RegisterClimberRequest, StatsResponse, UpdateRouteRequest,
};

use crux_core::{ClimbStyle, ClimberId, LockStatus, RankedStanding, Route, RouteId, Standing, User};
use crux_engine::{
    EngineMetricsSnapshot, LeaderboardEntry, RankingGap, RankingReport, RecountOutcome,
    RouteOverlay,
};
use crux_storage::{LogChangeKind, StoreStatistics};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Crux API",
        description = "Climbing leaderboard: routes are worth a share of their points split among everyone who completed them",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Ranking", description = "Persisted, live and manually triggered rankings"),
        (name = "Routes", description = "Route management and completion recounts"),
        (name = "Logs", description = "A climber's log of one route"),
        (name = "Climbers", description = "Climber profiles and per-climber route views"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Metrics and diagnostics"),
    ),
    paths(
        ranking::get_leaderboard,
        ranking::get_live_ranking,
        ranking::run_ranking,
        route::list_routes,
        route::create_route,
        route::get_route,
        route::put_route,
        route::recount_route,
        route::put_log,
        route::delete_log,
        climber::get_climber,
        climber::put_climber,
        climber::get_route_overlay,
        health::ping,
        health::readiness,
        stats::get_stats,
        metrics::metrics_handler,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        Route,
        RouteId,
        ClimberId,
        User,
        ClimbStyle,
        LockStatus,
        Standing,
        RankedStanding,
        LeaderboardEntry,
        RouteOverlay,
        RankingReport,
        RankingGap,
        RecountOutcome,
        EngineMetricsSnapshot,
        StoreStatistics,
        LogChangeKind,
        UpdateRouteRequest,
        PutLogRequest,
        LogWriteResponse,
        RegisterClimberRequest,
        StatsResponse,
        health::HealthResponse,
        health::HealthStatus,
        health::HealthDetails,
        health::ComponentHealth,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_endpoint() {
        let doc = ApiDoc::openapi();
        for path in [
            "/ranking",
            "/ranking/live",
            "/ranking/run",
            "/routes",
            "/routes/{route_id}",
            "/routes/{route_id}/recount",
            "/routes/{route_id}/logs/{climber_id}",
            "/climbers/{climber_id}",
            "/climbers/{climber_id}/routes",
            "/health/ready",
            "/stats",
            "/metrics",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_document_serializes() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("RankingReport"));
    }
}
