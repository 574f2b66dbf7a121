//! Shared application state for Axum routers.

use crux_core::EngineConfig;
use crux_engine::{CompletionCounter, EngineMetrics, RankingEngine, RankingQueryService};
use crux_storage::SharedStore;
use std::sync::Arc;
use std::time::Instant;

/// Everything a handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub counter: CompletionCounter,
    pub engine: RankingEngine,
    pub query: RankingQueryService,
    /// Shared by the counter, the engine and the scheduled job.
    pub metrics: Arc<EngineMetrics>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the engine pieces around one store and one metrics handle.
    pub fn new(store: SharedStore, config: EngineConfig) -> Self {
        let metrics = Arc::new(EngineMetrics::new());
        let counter = CompletionCounter::new(store.clone(), config.retry.clone(), metrics.clone());
        let query = RankingQueryService::new(store.clone(), &config);
        let engine = RankingEngine::with_metrics(store.clone(), config, metrics.clone());

        Self {
            store,
            counter,
            engine,
            query,
            metrics,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(SharedStore, store);
crate::impl_from_ref!(CompletionCounter, counter);
crate::impl_from_ref!(RankingEngine, engine);
crate::impl_from_ref!(RankingQueryService, query);
