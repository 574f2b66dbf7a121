//! Log change notifications
//!
//! Every log create, overwrite or delete is published as a [`LogChange`].
//! Delivery is at-least-once from the consumer's point of view: a lagging
//! receiver must resynchronise from the store rather than assume it saw
//! every event.

use crux_core::{ClimberId, LogKey, RouteId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default capacity of the log change channel.
pub const DEFAULT_CHANGE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum LogChangeKind {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for LogChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            LogChangeKind::Created => "created",
            LogChangeKind::Updated => "updated",
            LogChangeKind::Deleted => "deleted",
        };
        write!(f, "{}", value)
    }
}

/// A mutation of one log under one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogChange {
    pub route_id: RouteId,
    pub climber_id: ClimberId,
    pub kind: LogChangeKind,
    pub at: Timestamp,
}

impl LogChange {
    pub fn new(key: LogKey, kind: LogChangeKind) -> Self {
        Self {
            route_id: key.route_id,
            climber_id: key.climber_id,
            kind,
            at: chrono::Utc::now(),
        }
    }

    pub fn key(&self) -> LogKey {
        LogKey::new(self.route_id.clone(), self.climber_id.clone())
    }
}
