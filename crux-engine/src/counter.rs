//! Completion Counter Maintainer
//!
//! Keeps `Route.completion_count` equal to the number of completed logs
//! under the route. Each recount is one optimistic read-count-write
//! transaction; a conflict re-runs the whole cycle.

use crate::EngineMetrics;
use crux_core::{CruxResult, EntityType, RetryPolicy, RouteId, StorageError};
use crux_storage::{retry_on_conflict, LogChange, LogFilter, RouteMerge, SharedStore, Transaction};
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Result of one recount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecountOutcome {
    pub route_id: RouteId,
    /// Count stored on the route before this recount.
    pub previous: i64,
    /// Count of completed logs found.
    pub count: i64,
    /// Transaction attempts it took, 1 when there was no conflict.
    pub attempts: u32,
}

impl RecountOutcome {
    pub fn changed(&self) -> bool {
        self.previous != self.count
    }
}

/// Totals of a recount over every route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecountSummary {
    pub routes: usize,
    pub updated: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct CompletionCounter {
    store: SharedStore,
    retry: RetryPolicy,
    metrics: Arc<EngineMetrics>,
}

impl CompletionCounter {
    pub fn new(store: SharedStore, retry: RetryPolicy, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            store,
            retry,
            metrics,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Recompute one route's completion count and write it back.
    ///
    /// Idempotent: when the stored count is already right nothing is written.
    /// Fails with `NotFound` if the route does not exist.
    pub async fn recount_route(&self, route_id: &RouteId) -> CruxResult<RecountOutcome> {
        let attempts = AtomicU32::new(0);
        let result = retry_on_conflict(&self.retry, || {
            attempts.fetch_add(1, Ordering::Relaxed);
            self.recount_once(route_id)
        })
        .await;

        let attempts = attempts.load(Ordering::Relaxed);
        if attempts > 1 {
            self.metrics
                .transaction_retries
                .fetch_add(u64::from(attempts - 1), Ordering::Relaxed);
        }

        match result {
            Ok(mut outcome) => {
                outcome.attempts = attempts;
                if outcome.changed() {
                    EngineMetrics::incr(&self.metrics.recounts_updated);
                    tracing::debug!(
                        route_id = %route_id,
                        previous = outcome.previous,
                        count = outcome.count,
                        attempts,
                        "Completion count updated"
                    );
                } else {
                    EngineMetrics::incr(&self.metrics.recounts_unchanged);
                }
                Ok(outcome)
            }
            Err(e) => {
                EngineMetrics::incr(&self.metrics.recounts_failed);
                Err(e)
            }
        }
    }

    /// One read-count-write cycle.
    async fn recount_once(&self, route_id: &RouteId) -> CruxResult<RecountOutcome> {
        let mut tx = Transaction::new();
        let completed = self
            .store
            .tx_log_query(&mut tx, route_id, &LogFilter::completed())
            .await?;
        let route = self
            .store
            .tx_route_get(&mut tx, route_id)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity_type: EntityType::Route,
                id: route_id.to_string(),
            })?;

        let count = completed.len() as i64;
        let outcome = RecountOutcome {
            route_id: route_id.clone(),
            previous: route.completion_count,
            count,
            attempts: 1,
        };
        if !outcome.changed() {
            return Ok(outcome);
        }

        tx.merge_route(
            route_id.clone(),
            RouteMerge {
                completion_count: Some(count),
            },
        );
        self.store.commit(tx).await?;
        Ok(outcome)
    }

    /// Trigger entry point: recount the route the change happened under.
    pub async fn on_log_change(&self, change: &LogChange) -> CruxResult<RecountOutcome> {
        tracing::trace!(
            route_id = %change.route_id,
            climber_id = %change.climber_id,
            kind = %change.kind,
            "Log change received"
        );
        self.recount_route(&change.route_id).await
    }

    /// Recount every route. Individual failures are logged and counted.
    pub async fn recount_all(&self) -> CruxResult<RecountSummary> {
        let routes = self.store.route_list().await?;
        let mut summary = RecountSummary {
            routes: routes.len(),
            ..RecountSummary::default()
        };

        for route in routes {
            match self.recount_route(&route.route_id).await {
                Ok(outcome) if outcome.changed() => summary.updated += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(route_id = %route.route_id, error = %e, "Recount failed");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            routes = summary.routes,
            updated = summary.updated,
            failed = summary.failed,
            "Full recount completed"
        );
        Ok(summary)
    }
}
