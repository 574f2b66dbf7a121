//! Enum types for Crux records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record kind discriminator, used in errors and store keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EntityType {
    Route,
    Log,
    User,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            EntityType::Route => "Route",
            EntityType::Log => "Log",
            EntityType::User => "User",
        };
        write!(f, "{}", value)
    }
}

/// How a climber logged a route.
///
/// `None` is the distinguished "attempted but not completed" value. It is
/// also what a climber sees for routes they never logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ClimbStyle {
    #[default]
    None,
    Onsight,
    Flash,
    Redpoint,
    Toprope,
}

impl ClimbStyle {
    /// Whether this style counts as a completed ascent.
    pub fn is_completed(&self) -> bool {
        !matches!(self, ClimbStyle::None)
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            ClimbStyle::None => "none",
            ClimbStyle::Onsight => "onsight",
            ClimbStyle::Flash => "flash",
            ClimbStyle::Redpoint => "redpoint",
            ClimbStyle::Toprope => "toprope",
        }
    }
}

impl fmt::Display for ClimbStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for ClimbStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(ClimbStyle::None),
            "onsight" | "on-sight" => Ok(ClimbStyle::Onsight),
            "flash" => Ok(ClimbStyle::Flash),
            "redpoint" => Ok(ClimbStyle::Redpoint),
            "toprope" | "top-rope" => Ok(ClimbStyle::Toprope),
            _ => Err(format!("Invalid ClimbStyle: {}", s)),
        }
    }
}

/// Visibility/edit lock a climber can put on their own log. Irrelevant to scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum LockStatus {
    #[default]
    Editable,
    Locked,
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            LockStatus::Editable => "editable",
            LockStatus::Locked => "locked",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for LockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "editable" => Ok(LockStatus::Editable),
            "locked" => Ok(LockStatus::Locked),
            _ => Err(format!("Invalid LockStatus: {}", s)),
        }
    }
}
