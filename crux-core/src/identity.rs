//! Identity types for Crux records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Stable key of a route record.
///
/// Route ids are opaque strings. Routes created without an id get a
/// UUIDv7 rendered as text, so ids minted here sort by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct RouteId(String);

impl RouteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh timestamp-sortable route id.
    pub fn now_v7() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RouteId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Climber identity as issued by the sign-in provider.
///
/// Doubles as the User record key and as the Log record key within a route,
/// which is what limits a climber to one log per route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct ClimberId(String);

impl ClimberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClimberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClimberId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Composite key of a log: the parent route plus the climber.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LogKey {
    pub route_id: RouteId,
    pub climber_id: ClimberId,
}

impl LogKey {
    pub fn new(route_id: RouteId, climber_id: ClimberId) -> Self {
        Self {
            route_id,
            climber_id,
        }
    }
}

impl fmt::Display for LogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "routes/{}/logs/{}", self.route_id, self.climber_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_id_v7_is_unique() {
        let a = RouteId::now_v7();
        let b = RouteId::now_v7();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = ClimberId::new("uid-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"uid-42\"");

        let route: RouteId = serde_json::from_str("\"slab-7\"").unwrap();
        assert_eq!(route.as_str(), "slab-7");
    }

    #[test]
    fn test_log_key_display() {
        let key = LogKey::new(RouteId::new("r1"), ClimberId::new("c1"));
        assert_eq!(key.to_string(), "routes/r1/logs/c1");
    }
}
