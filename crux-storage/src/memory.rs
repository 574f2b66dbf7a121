//! In-memory record store
//!
//! Backs the development server and every test. All three collections sit
//! behind one lock so a commit validates and applies atomically.

use crate::{
    LogChange, LogChangeKind, LogFilter, ReadStamp, RecordStore, RouteUpsert, StoreStatistics,
    Transaction, TxWrite, Version, DEFAULT_CHANGE_CAPACITY,
};
use async_trait::async_trait;
use crux_core::{
    ClimberId, CruxError, CruxResult, EntityType, Log, LogKey, Route, RouteId, StorageError, User,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Serialisable dump of the whole store, used for seeding and fixtures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub logs: Vec<Log>,
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Clone)]
struct Versioned<T> {
    version: Version,
    record: T,
}

#[derive(Debug, Default)]
struct RouteLogs {
    version: Version,
    entries: BTreeMap<ClimberId, Log>,
}

#[derive(Debug, Default)]
struct StoreState {
    clock: Version,
    commits: u64,
    routes: BTreeMap<RouteId, Versioned<Route>>,
    logs: BTreeMap<RouteId, RouteLogs>,
    users: BTreeMap<ClimberId, Versioned<User>>,
}

impl StoreState {
    fn tick(&mut self) -> Version {
        self.clock += 1;
        self.clock
    }

    fn route_version(&self, route_id: &RouteId) -> Option<Version> {
        self.routes.get(route_id).map(|r| r.version)
    }

    fn logs_version(&self, route_id: &RouteId) -> Version {
        self.logs.get(route_id).map(|l| l.version).unwrap_or(0)
    }

    fn user_version(&self, climber_id: &ClimberId) -> Option<Version> {
        self.users.get(climber_id).map(|u| u.version)
    }

    fn current(&self, stamp: &ReadStamp) -> bool {
        match stamp {
            ReadStamp::Route { route_id, version } => self.route_version(route_id) == *version,
            ReadStamp::RouteLogs { route_id, version } => self.logs_version(route_id) == *version,
            ReadStamp::User {
                climber_id,
                version,
            } => self.user_version(climber_id) == *version,
        }
    }

    fn query(&self, route_id: &RouteId, filter: &LogFilter) -> Vec<Log> {
        self.logs
            .get(route_id)
            .map(|logs| {
                logs.entries
                    .values()
                    .filter(|log| filter.matches(log))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Injected failures for exercising error paths.
#[derive(Debug, Default)]
struct Faults {
    failing_climbers: HashSet<ClimberId>,
    commit_conflicts: u32,
    commit_failures: u32,
}

/// In-memory [`RecordStore`].
#[derive(Debug)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
    faults: Arc<Mutex<Faults>>,
    changes: broadcast::Sender<LogChange>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_change_capacity(DEFAULT_CHANGE_CAPACITY)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_change_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            faults: Arc::new(Mutex::new(Faults::default())),
            changes,
        }
    }

    /// Load a snapshot. Logs must reference a route present in the snapshot.
    ///
    /// Stored completion counts are taken as-is; run a full recount to
    /// bring them in line with the logs.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> CruxResult<Self> {
        let store = Self::new();
        {
            let mut state = store.write()?;
            for route in snapshot.routes {
                let version = state.tick();
                state.routes.insert(
                    route.route_id.clone(),
                    Versioned {
                        version,
                        record: route,
                    },
                );
            }
            for log in snapshot.logs {
                if !state.routes.contains_key(&log.route_id) {
                    return Err(ValidationError::DanglingReference {
                        entity_type: EntityType::Route,
                        id: log.route_id.to_string(),
                        referenced_by: log.key().to_string(),
                    }
                    .into());
                }
                let version = state.tick();
                let logs = state.logs.entry(log.route_id.clone()).or_default();
                logs.version = version;
                logs.entries.insert(log.climber_id.clone(), log);
            }
            for user in snapshot.users {
                let version = state.tick();
                state.users.insert(
                    user.climber_id.clone(),
                    Versioned {
                        version,
                        record: user,
                    },
                );
            }
        }
        Ok(store)
    }

    /// Parse a JSON snapshot and load it.
    pub fn from_json(json: &str) -> CruxResult<Self> {
        let snapshot: StoreSnapshot =
            serde_json::from_str(json).map_err(|e| ValidationError::InvalidValue {
                field: "snapshot".to_string(),
                reason: e.to_string(),
            })?;
        Self::from_snapshot(snapshot)
    }

    pub fn snapshot(&self) -> CruxResult<StoreSnapshot> {
        let state = self.read()?;
        Ok(StoreSnapshot {
            routes: state.routes.values().map(|r| r.record.clone()).collect(),
            logs: state
                .logs
                .values()
                .flat_map(|l| l.entries.values().cloned())
                .collect(),
            users: state.users.values().map(|u| u.record.clone()).collect(),
        })
    }

    // ------------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------------

    /// Make every cross-route log query for this climber fail.
    pub fn fail_log_queries_for(&self, climber_id: ClimberId) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.failing_climbers.insert(climber_id);
        }
    }

    /// Make the next `n` commits that write something fail with a conflict.
    pub fn inject_commit_conflicts(&self, n: u32) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.commit_conflicts = n;
        }
    }

    /// Make the next `n` commits that write something fail outright.
    pub fn inject_commit_failures(&self, n: u32) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.commit_failures = n;
        }
    }

    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            *faults = Faults::default();
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn read(&self) -> CruxResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| CruxError::from(StorageError::LockPoisoned))
    }

    fn write(&self) -> CruxResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| CruxError::from(StorageError::LockPoisoned))
    }

    fn faults(&self) -> CruxResult<std::sync::MutexGuard<'_, Faults>> {
        self.faults
            .lock()
            .map_err(|_| CruxError::from(StorageError::LockPoisoned))
    }

    fn publish(&self, change: LogChange) {
        // No receivers is not an error: nobody is maintaining counters yet.
        let _ = self.changes.send(change);
    }

    /// Consume one injected commit fault, if any is armed.
    fn take_commit_fault(&self, key: &str) -> CruxResult<()> {
        let mut faults = self.faults()?;
        if faults.commit_failures > 0 {
            faults.commit_failures -= 1;
            return Err(StorageError::TransactionFailed {
                reason: "injected commit failure".to_string(),
            }
            .into());
        }
        if faults.commit_conflicts > 0 {
            faults.commit_conflicts -= 1;
            return Err(StorageError::Conflict {
                key: key.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    // === Routes ===

    async fn route_get(&self, route_id: &RouteId) -> CruxResult<Option<Route>> {
        let state = self.read()?;
        Ok(state.routes.get(route_id).map(|r| r.record.clone()))
    }

    async fn route_list(&self) -> CruxResult<Vec<Route>> {
        let state = self.read()?;
        Ok(state.routes.values().map(|r| r.record.clone()).collect())
    }

    async fn route_upsert(&self, upsert: RouteUpsert) -> CruxResult<Route> {
        let route_id = upsert.route_id.unwrap_or_else(RouteId::now_v7);
        let mut state = self.write()?;
        let completion_count = state
            .routes
            .get(&route_id)
            .map(|r| r.record.completion_count)
            .unwrap_or(0);

        let route = Route {
            route_id: route_id.clone(),
            name: upsert.name,
            points: upsert.points,
            completion_count,
        };
        let version = state.tick();
        state.routes.insert(
            route_id,
            Versioned {
                version,
                record: route.clone(),
            },
        );
        Ok(route)
    }

    // === Logs ===

    async fn log_get(&self, key: &LogKey) -> CruxResult<Option<Log>> {
        let state = self.read()?;
        Ok(state
            .logs
            .get(&key.route_id)
            .and_then(|l| l.entries.get(&key.climber_id))
            .cloned())
    }

    async fn log_put(&self, log: &Log) -> CruxResult<LogChangeKind> {
        let kind = {
            let mut state = self.write()?;
            if !state.routes.contains_key(&log.route_id) {
                return Err(StorageError::NotFound {
                    entity_type: EntityType::Route,
                    id: log.route_id.to_string(),
                }
                .into());
            }
            let version = state.tick();
            let logs = state.logs.entry(log.route_id.clone()).or_default();
            logs.version = version;
            match logs.entries.insert(log.climber_id.clone(), log.clone()) {
                Some(_) => LogChangeKind::Updated,
                None => LogChangeKind::Created,
            }
        };
        self.publish(LogChange::new(log.key(), kind));
        Ok(kind)
    }

    async fn log_delete(&self, key: &LogKey) -> CruxResult<bool> {
        let existed = {
            let mut state = self.write()?;
            let version = state.tick();
            match state.logs.get_mut(&key.route_id) {
                Some(logs) => {
                    let removed = logs.entries.remove(&key.climber_id).is_some();
                    if removed {
                        logs.version = version;
                    }
                    removed
                }
                None => false,
            }
        };
        if existed {
            self.publish(LogChange::new(key.clone(), LogChangeKind::Deleted));
        }
        Ok(existed)
    }

    async fn log_query(&self, route_id: &RouteId, filter: &LogFilter) -> CruxResult<Vec<Log>> {
        let state = self.read()?;
        Ok(state.query(route_id, filter))
    }

    async fn log_query_group(&self, filter: &LogFilter) -> CruxResult<Vec<Log>> {
        if let Some(climber_id) = &filter.climber_id {
            if self.faults()?.failing_climbers.contains(climber_id) {
                return Err(StorageError::Unavailable {
                    reason: format!("log query for climber {} failed", climber_id),
                }
                .into());
            }
        }

        let state = self.read()?;
        Ok(state
            .logs
            .values()
            .flat_map(|l| l.entries.values())
            .filter(|log| filter.matches(log))
            .cloned()
            .collect())
    }

    fn subscribe_log_changes(&self) -> broadcast::Receiver<LogChange> {
        self.changes.subscribe()
    }

    // === Users ===

    async fn user_get(&self, climber_id: &ClimberId) -> CruxResult<Option<User>> {
        let state = self.read()?;
        Ok(state.users.get(climber_id).map(|u| u.record.clone()))
    }

    async fn user_list(&self) -> CruxResult<Vec<User>> {
        let state = self.read()?;
        Ok(state.users.values().map(|u| u.record.clone()).collect())
    }

    async fn user_put(&self, user: &User) -> CruxResult<()> {
        let mut state = self.write()?;
        let version = state.tick();
        state.users.insert(
            user.climber_id.clone(),
            Versioned {
                version,
                record: user.clone(),
            },
        );
        Ok(())
    }

    // === Transactions ===

    async fn tx_route_get(
        &self,
        tx: &mut Transaction,
        route_id: &RouteId,
    ) -> CruxResult<Option<Route>> {
        let state = self.read()?;
        let entry = state.routes.get(route_id);
        tx.record_read(ReadStamp::Route {
            route_id: route_id.clone(),
            version: entry.map(|r| r.version),
        });
        Ok(entry.map(|r| r.record.clone()))
    }

    async fn tx_log_query(
        &self,
        tx: &mut Transaction,
        route_id: &RouteId,
        filter: &LogFilter,
    ) -> CruxResult<Vec<Log>> {
        let state = self.read()?;
        tx.record_read(ReadStamp::RouteLogs {
            route_id: route_id.clone(),
            version: state.logs_version(route_id),
        });
        Ok(state.query(route_id, filter))
    }

    async fn tx_user_get(
        &self,
        tx: &mut Transaction,
        climber_id: &ClimberId,
    ) -> CruxResult<Option<User>> {
        let state = self.read()?;
        let entry = state.users.get(climber_id);
        tx.record_read(ReadStamp::User {
            climber_id: climber_id.clone(),
            version: entry.map(|u| u.version),
        });
        Ok(entry.map(|u| u.record.clone()))
    }

    async fn commit(&self, tx: Transaction) -> CruxResult<usize> {
        if tx.is_read_only() {
            return Ok(0);
        }

        let mut state = self.write()?;

        if let Some(stale) = tx.reads().iter().find(|stamp| !state.current(stamp)) {
            tracing::debug!(tx_id = %tx.id(), key = %stale.key(), "Read set changed before commit");
            return Err(StorageError::Conflict { key: stale.key() }.into());
        }

        for write in tx.writes() {
            if let TxWrite::Route { route_id, .. } = write {
                if !state.routes.contains_key(route_id) {
                    return Err(StorageError::NotFound {
                        entity_type: EntityType::Route,
                        id: route_id.to_string(),
                    }
                    .into());
                }
            }
        }

        self.take_commit_fault(&format!("tx/{}", tx.id()))?;

        let version = state.tick();
        for write in tx.writes() {
            match write {
                TxWrite::Route { route_id, merge } => {
                    if let Some(entry) = state.routes.get_mut(route_id) {
                        if let Some(count) = merge.completion_count {
                            entry.record.completion_count = count;
                        }
                        entry.version = version;
                    }
                }
                TxWrite::User { climber_id, merge } => {
                    let entry = state
                        .users
                        .entry(climber_id.clone())
                        .or_insert_with(|| Versioned {
                            version,
                            record: User::new(climber_id.clone(), ""),
                        });
                    if let Some(climbed) = merge.climbed {
                        entry.record.climbed = climbed;
                    }
                    if let Some(points) = merge.points {
                        entry.record.points = points;
                    }
                    if let Some(position) = merge.position {
                        entry.record.position = position;
                    }
                    if let Some(ranked_at) = merge.ranked_at {
                        entry.record.ranked_at = Some(ranked_at);
                    }
                    entry.version = version;
                }
                TxWrite::UserName { climber_id, name } => {
                    // Until the next run a new climber takes the last slot.
                    let last_slot = state.users.len() as u32;
                    let entry = state
                        .users
                        .entry(climber_id.clone())
                        .or_insert_with(|| {
                            let mut user = User::new(climber_id.clone(), "");
                            user.position = last_slot;
                            Versioned {
                                version,
                                record: user,
                            }
                        });
                    entry.record.name = name.clone();
                    entry.version = version;
                }
            }
        }
        state.commits += 1;

        Ok(tx.writes().len())
    }

    // === Health & diagnostics ===

    async fn health_check(&self) -> CruxResult<bool> {
        Ok(self.read().is_ok())
    }

    async fn statistics(&self) -> CruxResult<StoreStatistics> {
        let state = self.read()?;
        Ok(StoreStatistics {
            route_count: state.routes.len(),
            log_count: state.logs.values().map(|l| l.entries.len()).sum(),
            user_count: state.users.len(),
            commit_count: state.commits,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{retry_on_conflict, RouteMerge, StandingMerge};
    use crux_core::{ClimbStyle, RetryPolicy};

    fn route_upsert(id: &str, points: f64) -> RouteUpsert {
        RouteUpsert {
            route_id: Some(RouteId::new(id)),
            name: id.to_uppercase(),
            points,
        }
    }

    fn log(route: &str, climber: &str, style: ClimbStyle) -> Log {
        Log::new(RouteId::new(route), ClimberId::new(climber), style)
    }

    #[tokio::test]
    async fn test_route_upsert_preserves_completion_count() {
        let store = MemoryStore::new();
        store.route_upsert(route_upsert("r1", 60.0)).await.unwrap();

        let mut tx = Transaction::new();
        store.tx_route_get(&mut tx, &RouteId::new("r1")).await.unwrap();
        tx.merge_route(
            RouteId::new("r1"),
            RouteMerge {
                completion_count: Some(3),
            },
        );
        store.commit(tx).await.unwrap();

        let updated = store.route_upsert(route_upsert("r1", 90.0)).await.unwrap();
        assert_eq!(updated.points, 90.0);
        assert_eq!(updated.completion_count, 3);
    }

    #[tokio::test]
    async fn test_route_create_without_id_mints_one() {
        let store = MemoryStore::new();
        let route = store
            .route_upsert(RouteUpsert {
                route_id: None,
                name: "Slab".to_string(),
                points: 10.0,
            })
            .await
            .unwrap();
        assert!(uuid::Uuid::parse_str(route.route_id.as_str()).is_ok());
        assert_eq!(route.completion_count, 0);
    }

    #[tokio::test]
    async fn test_log_put_requires_route() {
        let store = MemoryStore::new();
        let err = store
            .log_put(&log("missing", "c1", ClimbStyle::Flash))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_log_put_reports_create_then_update() {
        let store = MemoryStore::new();
        store.route_upsert(route_upsert("r1", 60.0)).await.unwrap();

        let first = store.log_put(&log("r1", "c1", ClimbStyle::Flash)).await.unwrap();
        let second = store.log_put(&log("r1", "c1", ClimbStyle::None)).await.unwrap();
        assert_eq!(first, LogChangeKind::Created);
        assert_eq!(second, LogChangeKind::Updated);

        let stored = store
            .log_get(&LogKey::new(RouteId::new("r1"), ClimberId::new("c1")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.style, ClimbStyle::None);
    }

    #[tokio::test]
    async fn test_log_changes_are_published() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe_log_changes();
        store.route_upsert(route_upsert("r1", 60.0)).await.unwrap();
        store.log_put(&log("r1", "c1", ClimbStyle::Flash)).await.unwrap();
        let key = LogKey::new(RouteId::new("r1"), ClimberId::new("c1"));
        assert!(store.log_delete(&key).await.unwrap());
        assert!(!store.log_delete(&key).await.unwrap());

        let created = rx.recv().await.unwrap();
        assert_eq!(created.kind, LogChangeKind::Created);
        let deleted = rx.recv().await.unwrap();
        assert_eq!(deleted.kind, LogChangeKind::Deleted);
        assert_eq!(deleted.key(), key);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_group_query_spans_routes() {
        let store = MemoryStore::new();
        store.route_upsert(route_upsert("a", 60.0)).await.unwrap();
        store.route_upsert(route_upsert("b", 40.0)).await.unwrap();
        store.log_put(&log("a", "c1", ClimbStyle::Flash)).await.unwrap();
        store.log_put(&log("b", "c1", ClimbStyle::None)).await.unwrap();
        store.log_put(&log("b", "c2", ClimbStyle::Redpoint)).await.unwrap();

        let mine = store
            .log_query_group(&LogFilter::by_climber(ClimberId::new("c1")))
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);

        let completed_b = store
            .log_query(&RouteId::new("b"), &LogFilter::completed())
            .await
            .unwrap();
        assert_eq!(completed_b.len(), 1);
        assert_eq!(completed_b[0].climber_id.as_str(), "c2");
    }

    #[tokio::test]
    async fn test_commit_conflicts_when_logs_change() {
        let store = MemoryStore::new();
        store.route_upsert(route_upsert("r1", 60.0)).await.unwrap();
        let route_id = RouteId::new("r1");

        let mut tx = Transaction::new();
        let completed = store
            .tx_log_query(&mut tx, &route_id, &LogFilter::completed())
            .await
            .unwrap();
        store.tx_route_get(&mut tx, &route_id).await.unwrap();
        tx.merge_route(
            route_id.clone(),
            RouteMerge {
                completion_count: Some(completed.len() as i64),
            },
        );

        // Concurrent writer sneaks in between read and commit.
        store.log_put(&log("r1", "c1", ClimbStyle::Flash)).await.unwrap();

        let err = store.commit(tx).await.unwrap_err();
        assert!(err.is_conflict());
        let route = store.route_get(&route_id).await.unwrap().unwrap();
        assert_eq!(route.completion_count, 0);
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.user_put(&User::new(ClimberId::new("c1"), "Ada")).await.unwrap();

        let mut tx = Transaction::new();
        tx.merge_user(
            ClimberId::new("c1"),
            StandingMerge::scored(2, 60.0, 0, chrono::Utc::now()),
        );
        tx.merge_route(RouteId::new("missing"), RouteMerge::default());

        assert!(store.commit(tx).await.is_err());
        let user = store.user_get(&ClimberId::new("c1")).await.unwrap().unwrap();
        assert_eq!(user.points, 0.0);
        assert_eq!(store.statistics().await.unwrap().commit_count, 0);
    }

    #[tokio::test]
    async fn test_standing_merge_keeps_other_fields() {
        let store = MemoryStore::new();
        let mut user = User::new(ClimberId::new("c1"), "Ada");
        user.points = 42.0;
        user.climbed = 3;
        store.user_put(&user).await.unwrap();

        let mut tx = Transaction::new();
        tx.merge_user(ClimberId::new("c1"), StandingMerge::position_only(7));
        assert_eq!(store.commit(tx).await.unwrap(), 1);

        let stored = store.user_get(&ClimberId::new("c1")).await.unwrap().unwrap();
        assert_eq!(stored.position, 7);
        assert_eq!(stored.points, 42.0);
        assert_eq!(stored.climbed, 3);
        assert_eq!(stored.name, "Ada");
    }

    #[tokio::test]
    async fn test_rename_creates_or_keeps_standing() {
        let store = MemoryStore::new();
        let mut user = User::new(ClimberId::new("c1"), "Ada");
        user.points = 42.0;
        store.user_put(&user).await.unwrap();

        let mut tx = Transaction::new();
        tx.rename_user(ClimberId::new("c1"), "Ada L.");
        tx.rename_user(ClimberId::new("c2"), "Grace");
        assert_eq!(store.commit(tx).await.unwrap(), 2);

        let c1 = store.user_get(&ClimberId::new("c1")).await.unwrap().unwrap();
        assert_eq!((c1.name.as_str(), c1.points), ("Ada L.", 42.0));
        let c2 = store.user_get(&ClimberId::new("c2")).await.unwrap().unwrap();
        assert_eq!((c2.name.as_str(), c2.points, c2.climbed), ("Grace", 0.0, 0));
        assert_eq!(c2.position, 1);
    }

    #[tokio::test]
    async fn test_user_read_conflicts_with_concurrent_standing_write() {
        let store = MemoryStore::new();
        store.user_put(&User::new(ClimberId::new("c1"), "Ada")).await.unwrap();

        let mut tx = Transaction::new();
        let seen = store
            .tx_user_get(&mut tx, &ClimberId::new("c1"))
            .await
            .unwrap();
        assert!(seen.is_some());
        tx.rename_user(ClimberId::new("c1"), "Ada L.");

        // A ranking commit lands between the read and the rename.
        let mut ranking = Transaction::new();
        ranking.merge_user(ClimberId::new("c1"), StandingMerge::position_only(3));
        store.commit(ranking).await.unwrap();

        let err = store.commit(tx).await.unwrap_err();
        assert!(err.is_conflict());
        let stored = store.user_get(&ClimberId::new("c1")).await.unwrap().unwrap();
        assert_eq!((stored.name.as_str(), stored.position), ("Ada", 3));
    }

    #[tokio::test]
    async fn test_absent_user_read_conflicts_with_registration() {
        let store = MemoryStore::new();

        let mut tx = Transaction::new();
        assert!(store
            .tx_user_get(&mut tx, &ClimberId::new("c9"))
            .await
            .unwrap()
            .is_none());
        tx.rename_user(ClimberId::new("c9"), "First");

        let mut other = Transaction::new();
        other.rename_user(ClimberId::new("c9"), "Second");
        store.commit(other).await.unwrap();

        assert!(store.commit(tx).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_injected_conflicts_are_retried() {
        let store = MemoryStore::new();
        store.user_put(&User::new(ClimberId::new("c1"), "Ada")).await.unwrap();
        store.inject_commit_conflicts(2);

        let written = retry_on_conflict(&RetryPolicy::immediate(5), || async {
            let mut tx = Transaction::new();
            tx.merge_user(ClimberId::new("c1"), StandingMerge::position_only(1));
            store.commit(tx).await
        })
        .await
        .unwrap();

        assert_eq!(written, 1);
        assert_eq!(store.statistics().await.unwrap().commit_count, 1);
    }

    #[tokio::test]
    async fn test_failing_climber_query() {
        let store = MemoryStore::new();
        store.fail_log_queries_for(ClimberId::new("c1"));
        let err = store
            .log_query_group(&LogFilter::by_climber(ClimberId::new("c1")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CruxError::Storage(StorageError::Unavailable { .. })
        ));
        assert!(store
            .log_query_group(&LogFilter::by_climber(ClimberId::new("c2")))
            .await
            .is_ok());

        store.clear_faults();
        assert!(store
            .log_query_group(&LogFilter::by_climber(ClimberId::new("c1")))
            .await
            .is_ok());
    }

    #[test]
    fn test_snapshot_rejects_dangling_log() {
        let snapshot = StoreSnapshot {
            routes: vec![],
            logs: vec![log("gone", "c1", ClimbStyle::Flash)],
            users: vec![],
        };
        let err = MemoryStore::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(
            err,
            CruxError::Validation(ValidationError::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_snapshot_from_json() {
        let json = r#"{
            "routes": [{"route_id": "a", "name": "Arete", "points": 60}],
            "logs": [{"route_id": "a", "climber_id": "c1", "style": "flash"}],
            "users": [{"climber_id": "c1", "name": "Ada"}]
        }"#;
        let store = MemoryStore::from_json(json).unwrap();
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.routes.len(), 1);
        assert_eq!(snapshot.logs.len(), 1);
        assert_eq!(snapshot.users[0].name, "Ada");
        assert!(MemoryStore::from_json("not json").is_err());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use crux_core::ClimbStyle;
    use proptest::prelude::*;

    fn style_strategy() -> impl Strategy<Value = ClimbStyle> {
        prop_oneof![
            Just(ClimbStyle::None),
            Just(ClimbStyle::Flash),
            Just(ClimbStyle::Redpoint),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// At most one log per climber per route, whatever the write sequence.
        #[test]
        fn prop_one_log_per_climber_per_route(
            writes in prop::collection::vec((0usize..3, 0usize..4, style_strategy()), 1..40)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = MemoryStore::new();
                for r in 0..3 {
                    store.route_upsert(RouteUpsert {
                        route_id: Some(RouteId::new(format!("r{}", r))),
                        name: String::new(),
                        points: 10.0,
                    }).await.unwrap();
                }

                let mut expected = HashSet::new();
                for (r, c, style) in &writes {
                    let log = Log::new(
                        RouteId::new(format!("r{}", r)),
                        ClimberId::new(format!("c{}", c)),
                        *style,
                    );
                    expected.insert((*r, *c));
                    store.log_put(&log).await.unwrap();
                }

                let stats = store.statistics().await.unwrap();
                prop_assert_eq!(stats.log_count, expected.len());
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
