//! Request and response bodies that are not records themselves.

use crux_core::{ClimbStyle, ClimberId, LockStatus, RouteId};
use crux_engine::EngineMetricsSnapshot;
use crux_storage::{LogChangeKind, StoreStatistics};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `PUT /routes/{route_id}`. The id comes from the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateRouteRequest {
    pub name: String,
    pub points: f64,
}

/// Body of `PUT /routes/{route_id}/logs/{climber_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PutLogRequest {
    pub style: ClimbStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_status: Option<LockStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LogWriteResponse {
    pub route_id: RouteId,
    pub climber_id: ClimberId,
    pub change: LogChangeKind,
}

/// Body of `PUT /climbers/{climber_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RegisterClimberRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatsResponse {
    pub store: StoreStatistics,
    pub engine: EngineMetricsSnapshot,
    pub uptime_seconds: u64,
}
