//! Log query predicates

use crux_core::{ClimbStyle, ClimberId, Log};
use serde::{Deserialize, Serialize};

/// Equality or inequality on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldPredicate<T> {
    Eq(T),
    Ne(T),
}

impl<T: PartialEq> FieldPredicate<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            FieldPredicate::Eq(expected) => value == expected,
            FieldPredicate::Ne(excluded) => value != excluded,
        }
    }
}

/// Filter for log queries, either under one route or across every route.
///
/// Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    pub style: Option<FieldPredicate<ClimbStyle>>,
    pub climber_id: Option<ClimberId>,
}

impl LogFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Logs whose style is anything but `none`.
    pub fn completed() -> Self {
        Self {
            style: Some(FieldPredicate::Ne(ClimbStyle::None)),
            climber_id: None,
        }
    }

    /// Every log written by one climber.
    pub fn by_climber(climber_id: ClimberId) -> Self {
        Self {
            style: None,
            climber_id: Some(climber_id),
        }
    }

    pub fn with_style(mut self, predicate: FieldPredicate<ClimbStyle>) -> Self {
        self.style = Some(predicate);
        self
    }

    pub fn matches(&self, log: &Log) -> bool {
        if let Some(style) = &self.style {
            if !style.matches(&log.style) {
                return false;
            }
        }
        match &self.climber_id {
            Some(climber_id) => &log.climber_id == climber_id,
            None => true,
        }
    }
}
