//! Ranking Query Service
//!
//! The same enumerate-score-order pass as a scheduled run, returned to the
//! caller instead of committed. Nothing is written. Any climber that cannot
//! be scored fails the whole query, since there is no previous standing the
//! caller asked to fall back on.

use crate::engine::{compute_ranking, GapPolicy};
use crux_core::{CruxResult, EngineConfig, RankedStanding};
use crux_storage::SharedStore;

#[derive(Clone)]
pub struct RankingQueryService {
    store: SharedStore,
    max_concurrency: usize,
}

impl RankingQueryService {
    pub fn new(store: SharedStore, config: &EngineConfig) -> Self {
        Self {
            store,
            max_concurrency: config.max_concurrency,
        }
    }

    /// Freshly computed ranking, ordered by position.
    pub async fn current_ranking(&self) -> CruxResult<Vec<RankedStanding>> {
        let computed = compute_ranking(&self.store, self.max_concurrency, GapPolicy::Fail).await?;
        tracing::debug!(ranked = computed.standings.len(), "On-demand ranking computed");
        Ok(computed.standings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crux_core::{ClimbStyle, ClimberId, Log, RouteId, User};
    use crux_storage::{MemoryStore, RecordStore, RouteUpsert};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_query_has_no_side_effects() {
        let store = Arc::new(MemoryStore::new());
        store
            .route_upsert(RouteUpsert {
                route_id: Some(RouteId::new("r")),
                name: "Roof".to_string(),
                points: 50.0,
            })
            .await
            .unwrap();
        store.user_put(&User::new(ClimberId::new("c"), "Ada")).await.unwrap();
        store
            .log_put(&Log::new(RouteId::new("r"), ClimberId::new("c"), ClimbStyle::Flash))
            .await
            .unwrap();

        let service = RankingQueryService::new(store.clone(), &EngineConfig::default());
        let ranking = service.current_ranking().await.unwrap();
        assert_eq!(ranking.len(), 1);
        // Counter still at zero, so the fallback awards full value.
        assert_eq!(ranking[0].standing.points, 50.0);

        let stored = store.user_get(&ClimberId::new("c")).await.unwrap().unwrap();
        assert_eq!(stored.points, 0.0);
        assert_eq!(store.statistics().await.unwrap().commit_count, 0);
    }

    #[tokio::test]
    async fn test_query_surfaces_fetch_failure() {
        let store = Arc::new(MemoryStore::new());
        store.user_put(&User::new(ClimberId::new("c"), "Ada")).await.unwrap();
        store.fail_log_queries_for(ClimberId::new("c"));

        let service = RankingQueryService::new(store.clone(), &EngineConfig::default());
        assert!(service.current_ranking().await.is_err());
    }
}
