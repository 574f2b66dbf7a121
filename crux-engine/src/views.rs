//! Read views handed to the presentation layer

use crux_core::{ClimbStyle, ClimberId, CruxResult, LockStatus, Route};
use crux_storage::{LogFilter, SharedStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A route as one climber sees it: their own style and lock on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RouteOverlay {
    #[serde(flatten)]
    pub route: Route,
    pub style: ClimbStyle,
    pub lock_status: LockStatus,
}

/// One row of the persisted leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LeaderboardEntry {
    pub id: ClimberId,
    pub position: u32,
    pub routes_climbed: u32,
    pub points: f64,
    pub name: String,
}

/// Every route with the climber's log overlaid. Routes they never logged
/// show style `none`, and a missing lock shows as `editable`.
pub async fn route_overlay(store: &SharedStore, climber_id: &ClimberId) -> CruxResult<Vec<RouteOverlay>> {
    let routes = store.route_list().await?;
    let mut logs: HashMap<_, _> = store
        .log_query_group(&LogFilter::by_climber(climber_id.clone()))
        .await?
        .into_iter()
        .map(|log| (log.route_id.clone(), log))
        .collect();

    Ok(routes
        .into_iter()
        .map(|route| {
            let log = logs.remove(&route.route_id);
            RouteOverlay {
                style: log.as_ref().map(|l| l.style).unwrap_or_default(),
                lock_status: log.and_then(|l| l.lock_status).unwrap_or_default(),
                route,
            }
        })
        .collect())
}

/// Persisted standings ordered by position.
pub async fn leaderboard(store: &SharedStore) -> CruxResult<Vec<LeaderboardEntry>> {
    let mut users = store.user_list().await?;
    users.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| a.climber_id.cmp(&b.climber_id))
    });

    Ok(users
        .into_iter()
        .map(|user| LeaderboardEntry {
            id: user.climber_id,
            position: user.position,
            routes_climbed: user.climbed,
            points: user.points,
            name: user.name,
        })
        .collect())
}
