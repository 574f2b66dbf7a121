//! Log change trigger listener
//!
//! Turns the store's log change feed into recounts. Each change is its own
//! unit of work; recounts on different routes run concurrently and
//! recounts on the same route are serialised by the store transaction.

use crate::CompletionCounter;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

/// Spawn the listener. It subscribes before returning, so no change written
/// after this call is missed.
///
/// If the listener falls behind the feed it recounts every route instead of
/// replaying what it skipped. On shutdown it waits for in-flight recounts.
pub fn spawn_trigger_listener(
    counter: CompletionCounter,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let mut changes = counter.store().subscribe_log_changes();

    tokio::spawn(async move {
        let mut inflight = JoinSet::new();
        tracing::info!("Completion trigger listener started");

        loop {
            while inflight.try_join_next().is_some() {}

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::info!("Completion trigger listener shutting down");
                        break;
                    }
                }

                received = changes.recv() => match received {
                    Ok(change) => {
                        let counter = counter.clone();
                        inflight.spawn(async move {
                            if let Err(e) = counter.on_log_change(&change).await {
                                tracing::warn!(
                                    route_id = %change.route_id,
                                    climber_id = %change.climber_id,
                                    error = %e,
                                    "Recount after log change failed"
                                );
                            }
                        });
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Trigger listener lagged, recounting every route");
                        let counter = counter.clone();
                        inflight.spawn(async move {
                            if let Err(e) = counter.recount_all().await {
                                tracing::error!(error = %e, "Full recount after lag failed");
                            }
                        });
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("Log change feed closed");
                        break;
                    }
                }
            }
        }

        while inflight.join_next().await.is_some() {}
    })
}
