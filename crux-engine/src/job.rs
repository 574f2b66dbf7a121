//! Scheduled ranking job
//!
//! Fires the Scoring & Ranking Engine every `ranking_interval` until the
//! shutdown signal is received.
//!
//! ```ignore
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let handle = tokio::spawn(ranking_job(engine, shutdown_rx));
//!
//! // Later
//! let _ = shutdown_tx.send(true);
//! let metrics = handle.await?;
//! ```

use crate::{EngineMetrics, RankingEngine};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Background task that runs the engine on a fixed cadence.
///
/// Runs execute one after another; a tick that arrives while a run is still
/// going is skipped rather than queued. Failed runs are logged and the
/// next tick tries again from current data.
pub async fn ranking_job(
    engine: RankingEngine,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<EngineMetrics> {
    let period = engine.config().ranking_interval;
    let first_tick = if engine.config().run_on_startup {
        Instant::now()
    } else {
        Instant::now() + period
    };
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        interval_secs = period.as_secs(),
        run_on_startup = engine.config().run_on_startup,
        "Ranking job started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Ranking job shutting down");
                    break;
                }
            }

            _ = ticker.tick() => {
                // Errors are already logged and counted by the engine.
                let _ = engine.run().await;
            }
        }
    }

    let snapshot = engine.metrics().snapshot();
    tracing::info!(
        runs_committed = snapshot.ranking_runs_committed,
        runs_failed = snapshot.ranking_runs_failed,
        gaps = snapshot.ranking_gaps,
        "Ranking job completed"
    );

    Arc::clone(engine.metrics())
}
