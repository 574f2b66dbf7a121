//! Core record structures

use crate::{ClimbStyle, ClimberId, CruxResult, LockStatus, LogKey, RouteId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

/// A climbable line with a fixed base point value.
///
/// `completion_count` is denormalized: it is the number of completed logs
/// under this route as last written by the counter maintainer, and may lag
/// behind the logs themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Route {
    pub route_id: RouteId,
    pub name: String,
    pub points: f64,
    #[serde(default)]
    pub completion_count: i64,
}

impl Route {
    pub fn new(route_id: RouteId, name: impl Into<String>, points: f64) -> Self {
        Self {
            route_id,
            name: name.into(),
            points,
            completion_count: 0,
        }
    }

    /// Check the fields scoring depends on.
    pub fn validate(&self) -> CruxResult<()> {
        if !self.points.is_finite() || self.points < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: format!("routes/{}.points", self.route_id),
                reason: format!("expected a non-negative number, got {}", self.points),
            }
            .into());
        }
        if self.completion_count < 0 {
            return Err(ValidationError::InvalidValue {
                field: format!("routes/{}.completion_count", self.route_id),
                reason: format!("expected a non-negative count, got {}", self.completion_count),
            }
            .into());
        }
        Ok(())
    }
}

/// One climber's record of one route, nested under that route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Log {
    pub route_id: RouteId,
    pub climber_id: ClimberId,
    pub style: ClimbStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_status: Option<LockStatus>,
}

impl Log {
    pub fn new(route_id: RouteId, climber_id: ClimberId, style: ClimbStyle) -> Self {
        Self {
            route_id,
            climber_id,
            style,
            lock_status: None,
        }
    }

    pub fn with_lock_status(mut self, lock_status: LockStatus) -> Self {
        self.lock_status = Some(lock_status);
        self
    }

    pub fn key(&self) -> LogKey {
        LogKey::new(self.route_id.clone(), self.climber_id.clone())
    }

    pub fn is_completed(&self) -> bool {
        self.style.is_completed()
    }
}

/// A climber's published standing.
///
/// `climbed`, `points`, `position` and `ranked_at` are written only by the
/// ranking engine. `position` is 0-based, 0 is first place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct User {
    pub climber_id: ClimberId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub climbed: u32,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub position: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub ranked_at: Option<Timestamp>,
}

impl User {
    pub fn new(climber_id: ClimberId, name: impl Into<String>) -> Self {
        Self {
            climber_id,
            name: name.into(),
            climbed: 0,
            points: 0.0,
            position: 0,
            ranked_at: None,
        }
    }
}
