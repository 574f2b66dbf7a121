//! Engine activity counters
//!
//! Process-local atomics shared by the counter maintainer, the ranking
//! engine and the ranking job. The API layer copies a snapshot into its
//! Prometheus registry at scrape time.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Recounts that wrote a new completion count
    pub recounts_updated: AtomicU64,

    /// Recounts that found the stored count already correct
    pub recounts_unchanged: AtomicU64,

    /// Recounts that failed after retries
    pub recounts_failed: AtomicU64,

    /// Transaction bodies re-run after a conflict
    pub transaction_retries: AtomicU64,

    /// Ranking runs whose commit succeeded
    pub ranking_runs_committed: AtomicU64,

    /// Ranking runs discarded before or at commit
    pub ranking_runs_failed: AtomicU64,

    /// Climbers left unscored across all runs
    pub ranking_gaps: AtomicU64,

    /// Wall time of the most recent ranking run, in milliseconds
    pub last_run_duration_ms: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            recounts_updated: self.recounts_updated.load(Ordering::Relaxed),
            recounts_unchanged: self.recounts_unchanged.load(Ordering::Relaxed),
            recounts_failed: self.recounts_failed.load(Ordering::Relaxed),
            transaction_retries: self.transaction_retries.load(Ordering::Relaxed),
            ranking_runs_committed: self.ranking_runs_committed.load(Ordering::Relaxed),
            ranking_runs_failed: self.ranking_runs_failed.load(Ordering::Relaxed),
            ranking_gaps: self.ranking_gaps.load(Ordering::Relaxed),
            last_run_duration_ms: self.last_run_duration_ms.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of engine metrics at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EngineMetricsSnapshot {
    pub recounts_updated: u64,
    pub recounts_unchanged: u64,
    pub recounts_failed: u64,
    pub transaction_retries: u64,
    pub ranking_runs_committed: u64,
    pub ranking_runs_failed: u64,
    pub ranking_gaps: u64,
    pub last_run_duration_ms: u64,
}
