//! Record store contract
//!
//! The minimum a document store must offer for the counter maintainer and
//! the ranking engine to work: point reads and writes, filtered queries
//! under one route or across every route, and optimistic transactions.

use crate::{LogChange, LogChangeKind, LogFilter, Transaction};
use async_trait::async_trait;
use crux_core::{ClimberId, CruxResult, Log, LogKey, Route, RouteId, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared, type-erased store handle.
pub type SharedStore = Arc<dyn RecordStore>;

/// Route create-or-replace as issued by route management.
///
/// Carries no completion count: the stored count is preserved on update
/// and starts at zero on create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RouteUpsert {
    /// Absent means "create with a fresh id".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<RouteId>,
    pub name: String,
    pub points: f64,
}

/// Record counts for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StoreStatistics {
    pub route_count: usize,
    pub log_count: usize,
    pub user_count: usize,
    pub commit_count: u64,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    // ========================================================================
    // ROUTES
    // ========================================================================

    async fn route_get(&self, route_id: &RouteId) -> CruxResult<Option<Route>>;

    async fn route_list(&self) -> CruxResult<Vec<Route>>;

    async fn route_upsert(&self, upsert: RouteUpsert) -> CruxResult<Route>;

    // ========================================================================
    // LOGS
    // ========================================================================

    async fn log_get(&self, key: &LogKey) -> CruxResult<Option<Log>>;

    /// Create or overwrite a log. Fails with `NotFound` if the parent route
    /// does not exist.
    async fn log_put(&self, log: &Log) -> CruxResult<LogChangeKind>;

    /// Delete a log. Returns whether it existed.
    async fn log_delete(&self, key: &LogKey) -> CruxResult<bool>;

    /// Logs under one route matching `filter`.
    async fn log_query(&self, route_id: &RouteId, filter: &LogFilter) -> CruxResult<Vec<Log>>;

    /// Logs under any route matching `filter`.
    async fn log_query_group(&self, filter: &LogFilter) -> CruxResult<Vec<Log>>;

    /// Receiver for log create/update/delete events.
    fn subscribe_log_changes(&self) -> broadcast::Receiver<LogChange>;

    // ========================================================================
    // USERS
    // ========================================================================

    async fn user_get(&self, climber_id: &ClimberId) -> CruxResult<Option<User>>;

    async fn user_list(&self) -> CruxResult<Vec<User>>;

    async fn user_put(&self, user: &User) -> CruxResult<()>;

    // ========================================================================
    // TRANSACTIONS
    // ========================================================================

    async fn tx_route_get(
        &self,
        tx: &mut Transaction,
        route_id: &RouteId,
    ) -> CruxResult<Option<Route>>;

    async fn tx_log_query(
        &self,
        tx: &mut Transaction,
        route_id: &RouteId,
        filter: &LogFilter,
    ) -> CruxResult<Vec<Log>>;

    async fn tx_user_get(
        &self,
        tx: &mut Transaction,
        climber_id: &ClimberId,
    ) -> CruxResult<Option<User>>;

    /// Validate the read set and apply every buffered write, or nothing.
    /// Returns the number of records written.
    async fn commit(&self, tx: Transaction) -> CruxResult<usize>;

    // ========================================================================
    // HEALTH & DIAGNOSTICS
    // ========================================================================

    async fn health_check(&self) -> CruxResult<bool>;

    async fn statistics(&self) -> CruxResult<StoreStatistics>;
}
