//! Server assembly: store seeding and background task wiring.

use std::path::Path;
use std::sync::Arc;

use crux_engine::{ranking_job, spawn_trigger_listener};
use crux_storage::MemoryStore;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::subscriptions::{SubscriptionPurpose, SubscriptionTable};

/// Build the in-memory store, loading the seed snapshot when one is configured.
pub fn load_store(config: &ApiConfig) -> ApiResult<Arc<MemoryStore>> {
    match &config.seed_path {
        Some(path) => load_seed(path).map(Arc::new),
        None => {
            tracing::info!("No seed configured, starting with an empty store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn load_seed(path: &Path) -> ApiResult<MemoryStore> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        ApiError::invalid_input(format!("Cannot read seed file {}: {}", path.display(), e))
    })?;
    let store = MemoryStore::from_json(&json)?;
    tracing::info!(path = %path.display(), "Store seeded");
    Ok(store)
}

/// Start the completion trigger listener and the scheduled ranking job.
///
/// Completion counts are reconciled first so the first ranking run never
/// sees counts that lag the seeded logs.
pub async fn start_background_tasks(
    state: &AppState,
    subscriptions: &mut SubscriptionTable,
) -> ApiResult<()> {
    let summary = state.counter.recount_all().await?;
    tracing::info!(
        routes = summary.routes,
        updated = summary.updated,
        failed = summary.failed,
        "Completion counts reconciled"
    );

    let counter = state.counter.clone();
    subscriptions
        .subscribe(SubscriptionPurpose::CompletionTrigger, move |shutdown_rx| {
            spawn_trigger_listener(counter, shutdown_rx)
        })
        .await;

    let engine = state.engine.clone();
    subscriptions
        .subscribe(SubscriptionPurpose::RankingJob, move |shutdown_rx| {
            tokio::spawn(async move {
                ranking_job(engine, shutdown_rx).await;
            })
        })
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crux_core::{EngineConfig, RouteId};
    use crux_storage::RecordStore;
    use std::io::Write;

    #[test]
    fn test_load_store_without_seed_is_empty() {
        let store = load_store(&ApiConfig::default()).unwrap();
        assert!(store.snapshot().unwrap().routes.is_empty());
    }

    #[test]
    fn test_load_store_from_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"routes":[{{"route_id":"a","name":"Arete","points":60}}],"logs":[{{"route_id":"a","climber_id":"c1","style":"flash"}}]}}"#
        )
        .unwrap();

        let config = ApiConfig {
            seed_path: Some(file.path().to_path_buf()),
            ..ApiConfig::default()
        };
        let snapshot = load_store(&config).unwrap().snapshot().unwrap();
        assert_eq!(snapshot.routes.len(), 1);
        assert_eq!(snapshot.logs.len(), 1);
    }

    #[test]
    fn test_missing_seed_file_is_an_error() {
        let config = ApiConfig {
            seed_path: Some("/nonexistent/crux-seed.json".into()),
            ..ApiConfig::default()
        };
        assert!(load_store(&config).is_err());
    }

    #[tokio::test]
    async fn test_background_tasks_reconcile_then_subscribe() {
        let store = crux_test_utils::fixtures::store(crux_test_utils::fixtures::two_route_board());
        let state = AppState::new(
            store.clone(),
            EngineConfig {
                run_on_startup: false,
                ..EngineConfig::default()
            },
        );
        let mut subscriptions = SubscriptionTable::new();

        start_background_tasks(&state, &mut subscriptions).await.unwrap();

        let a = store.route_get(&RouteId::new("a")).await.unwrap().unwrap();
        assert_eq!(a.completion_count, 3);
        assert!(subscriptions.is_active(SubscriptionPurpose::CompletionTrigger));
        assert!(subscriptions.is_active(SubscriptionPurpose::RankingJob));

        subscriptions.unsubscribe_all().await;
        assert!(subscriptions.is_empty());
    }
}
