//! Optimistic transactions
//!
//! A [`Transaction`] remembers the version of everything it read and
//! buffers merges. The store applies the merges only if none of the reads
//! changed in the meantime; otherwise commit fails with
//! `StorageError::Conflict` and nothing is written. Callers re-run the whole
//! read-compute-write body through [`retry_on_conflict`].

use crux_core::{ClimberId, CruxResult, RetryPolicy, RouteId, Timestamp};
use std::future::Future;
use uuid::Uuid;

/// Record version as stamped by the store. Absent records have no version.
pub type Version = u64;

/// Version of something a transaction read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStamp {
    Route {
        route_id: RouteId,
        version: Option<Version>,
    },
    /// The whole log collection under one route. Any log write under the
    /// route bumps this version.
    RouteLogs { route_id: RouteId, version: Version },
    User {
        climber_id: ClimberId,
        version: Option<Version>,
    },
}

impl ReadStamp {
    /// Store path of the stamped record, for conflict reporting.
    pub fn key(&self) -> String {
        match self {
            ReadStamp::Route { route_id, .. } => format!("routes/{}", route_id),
            ReadStamp::RouteLogs { route_id, .. } => format!("routes/{}/logs", route_id),
            ReadStamp::User { climber_id, .. } => format!("users/{}", climber_id),
        }
    }
}

/// Partial route update. Only the counter maintainer writes routes inside a
/// transaction, so the only mergeable field is the completion count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMerge {
    pub completion_count: Option<i64>,
}

/// Partial user update written by the ranking engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandingMerge {
    pub climbed: Option<u32>,
    pub points: Option<f64>,
    pub position: Option<u32>,
    pub ranked_at: Option<Timestamp>,
}

impl StandingMerge {
    /// Full standing update: score fields plus position.
    pub fn scored(climbed: u32, points: f64, position: u32, ranked_at: Timestamp) -> Self {
        Self {
            climbed: Some(climbed),
            points: Some(points),
            position: Some(position),
            ranked_at: Some(ranked_at),
        }
    }

    /// Position-only update for a climber whose score could not be computed.
    pub fn position_only(position: u32) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }
}

/// A buffered write.
#[derive(Debug, Clone, PartialEq)]
pub enum TxWrite {
    Route { route_id: RouteId, merge: RouteMerge },
    User { climber_id: ClimberId, merge: StandingMerge },
    /// Display name change. Leaves the standing untouched.
    UserName { climber_id: ClimberId, name: String },
}

/// Read set and write buffer of one optimistic transaction.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: Uuid,
    reads: Vec<ReadStamp>,
    writes: Vec<TxWrite>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn record_read(&mut self, stamp: ReadStamp) {
        self.reads.push(stamp);
    }

    pub fn merge_route(&mut self, route_id: RouteId, merge: RouteMerge) {
        self.writes.push(TxWrite::Route { route_id, merge });
    }

    pub fn merge_user(&mut self, climber_id: ClimberId, merge: StandingMerge) {
        self.writes.push(TxWrite::User { climber_id, merge });
    }

    pub fn rename_user(&mut self, climber_id: ClimberId, name: impl Into<String>) {
        self.writes.push(TxWrite::UserName {
            climber_id,
            name: name.into(),
        });
    }

    pub fn reads(&self) -> &[ReadStamp] {
        &self.reads
    }

    pub fn writes(&self) -> &[TxWrite] {
        &self.writes
    }

    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Run `body` until it succeeds, fails with a non-conflict error, or the
/// policy runs out of attempts.
///
/// The body must perform its own reads: a retry re-executes the full
/// read-compute-write cycle, never a partial one.
pub async fn retry_on_conflict<T, F, Fut>(policy: &RetryPolicy, mut body: F) -> CruxResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CruxResult<T>>,
{
    let mut attempt = 1;
    loop {
        match body().await {
            Err(e) if e.is_conflict() && attempt < policy.max_attempts => {
                let delay = policy.backoff_for(attempt);
                tracing::debug!(attempt, ?delay, error = %e, "Transaction conflict, retrying");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(e) if e.is_conflict() => {
                tracing::warn!(attempts = attempt, error = %e, "Transaction conflict, giving up");
                return Err(e);
            }
            other => return other,
        }
    }
}
