//! Crux Storage - Record Store Contract and In-Memory Store
//!
//! Defines the store abstraction the counter maintainer and ranking engine
//! run against, the optimistic transaction primitive, and `MemoryStore`.

pub mod events;
pub mod filter;
pub mod memory;
pub mod store;
pub mod transaction;

pub use events::{LogChange, LogChangeKind, DEFAULT_CHANGE_CAPACITY};
pub use filter::{FieldPredicate, LogFilter};
pub use memory::{MemoryStore, StoreSnapshot};
pub use store::{RecordStore, RouteUpsert, SharedStore, StoreStatistics};
pub use transaction::{
    retry_on_conflict, ReadStamp, RouteMerge, StandingMerge, Transaction, TxWrite, Version,
};
