//! Error types for Crux operations

use crate::EntityType;
use thiserror::Error;

/// Record store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: String },

    #[error("Transaction conflict on {key}: record changed since it was read")]
    Conflict { key: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Malformed record errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("{referenced_by} references missing {entity_type:?} {id}")]
    DanglingReference {
        entity_type: EntityType,
        id: String,
        referenced_by: String,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Crux errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CruxError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl CruxError {
    /// Transient conflict that is resolved by re-running the whole transaction body.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CruxError::Storage(StorageError::Conflict { .. }))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CruxError::Storage(StorageError::NotFound { .. }))
    }
}

/// Result type alias for Crux operations.
pub type CruxResult<T> = Result<T, CruxError>;

// =============================================================================
// TESTS
// =============================================================================
