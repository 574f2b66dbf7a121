//! Background task registry
//!
//! Long-running listeners and jobs are owned by whoever builds the server,
//! one entry per purpose. Registering a purpose twice replaces (and stops)
//! the earlier task. `unsubscribe_all` stops everything on shutdown.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How long a task gets to exit after its shutdown signal before it is aborted.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubscriptionPurpose {
    /// Log change feed driving the completion counter
    CompletionTrigger,
    /// Scheduled ranking runs
    RankingJob,
}

impl fmt::Display for SubscriptionPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SubscriptionPurpose::CompletionTrigger => "completion_trigger",
            SubscriptionPurpose::RankingJob => "ranking_job",
        };
        write!(f, "{}", value)
    }
}

struct Subscription {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Subscription {
    async fn cancel(self, purpose: SubscriptionPurpose, grace: Duration) {
        let _ = self.shutdown_tx.send(true);
        let mut handle = self.handle;
        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => tracing::debug!(%purpose, "Subscription stopped"),
            Ok(Err(e)) => tracing::warn!(%purpose, error = %e, "Subscription task ended abnormally"),
            Err(_) => {
                tracing::warn!(%purpose, "Subscription ignored shutdown, aborting");
                handle.abort();
            }
        }
    }
}

/// Caller-owned table of running background tasks.
pub struct SubscriptionTable {
    entries: HashMap<SubscriptionPurpose, Subscription>,
    grace: Duration,
}

impl Default for SubscriptionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::with_grace(DEFAULT_STOP_GRACE)
    }

    pub fn with_grace(grace: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            grace,
        }
    }

    /// Start a task under `purpose`, stopping whatever held it before.
    ///
    /// `start` receives the shutdown receiver and returns the spawned task.
    pub async fn subscribe<F>(&mut self, purpose: SubscriptionPurpose, start: F)
    where
        F: FnOnce(watch::Receiver<bool>) -> JoinHandle<()>,
    {
        if let Some(previous) = self.entries.remove(&purpose) {
            tracing::info!(%purpose, "Replacing existing subscription");
            previous.cancel(purpose, self.grace).await;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = start(shutdown_rx);
        self.entries.insert(purpose, Subscription { shutdown_tx, handle });
        tracing::info!(%purpose, "Subscription registered");
    }

    /// Stop one task. Returns whether it was registered.
    pub async fn unsubscribe(&mut self, purpose: SubscriptionPurpose) -> bool {
        match self.entries.remove(&purpose) {
            Some(subscription) => {
                subscription.cancel(purpose, self.grace).await;
                true
            }
            None => false,
        }
    }

    /// Stop every task, in purpose order.
    pub async fn unsubscribe_all(&mut self) {
        let mut purposes: Vec<_> = self.entries.keys().copied().collect();
        purposes.sort();
        for purpose in purposes {
            self.unsubscribe(purpose).await;
        }
    }

    pub fn is_active(&self, purpose: SubscriptionPurpose) -> bool {
        self.entries
            .get(&purpose)
            .is_some_and(|s| !s.handle.is_finished())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// A task that waits for shutdown and then bumps `stopped`.
    fn polite(stopped: Arc<AtomicUsize>) -> impl FnOnce(watch::Receiver<bool>) -> JoinHandle<()> {
        move |mut rx| {
            tokio::spawn(async move {
                while !*rx.borrow() {
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
                stopped.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    #[tokio::test]
    async fn test_resubscribe_stops_previous_task() {
        let stopped = Arc::new(AtomicUsize::new(0));
        let mut table = SubscriptionTable::new();

        table
            .subscribe(SubscriptionPurpose::RankingJob, polite(stopped.clone()))
            .await;
        table
            .subscribe(SubscriptionPurpose::RankingJob, polite(stopped.clone()))
            .await;

        assert_eq!(stopped.load(Ordering::SeqCst), 1);
        assert_eq!(table.len(), 1);
        assert!(table.is_active(SubscriptionPurpose::RankingJob));
    }

    #[tokio::test]
    async fn test_unsubscribe_all_stops_everything() {
        let stopped = Arc::new(AtomicUsize::new(0));
        let mut table = SubscriptionTable::new();

        table
            .subscribe(SubscriptionPurpose::RankingJob, polite(stopped.clone()))
            .await;
        table
            .subscribe(SubscriptionPurpose::CompletionTrigger, polite(stopped.clone()))
            .await;
        table.unsubscribe_all().await;

        assert_eq!(stopped.load(Ordering::SeqCst), 2);
        assert!(table.is_empty());
        assert!(!table.unsubscribe(SubscriptionPurpose::RankingJob).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stubborn_task_is_aborted() {
        let mut table = SubscriptionTable::with_grace(Duration::from_millis(50));
        table
            .subscribe(SubscriptionPurpose::CompletionTrigger, |_rx| {
                tokio::spawn(async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                })
            })
            .await;

        assert!(table.unsubscribe(SubscriptionPurpose::CompletionTrigger).await);
        assert!(!table.is_active(SubscriptionPurpose::CompletionTrigger));
    }
}
