//! Error Types for the Crux API
//!
//! - `ApiError` is the JSON body of every failed request
//! - `ErrorCode` categorizes it and picks the HTTP status
//! - `From<CruxError>` maps store and validation failures onto codes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crux_core::{ConfigError, CruxError, EntityType, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Request Errors (400)
    // ========================================================================
    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    // ========================================================================
    // Record Errors (422)
    // ========================================================================
    /// A stored record is malformed and cannot be scored
    MalformedRecord,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    /// Requested route does not exist
    RouteNotFound,

    /// Requested climber does not exist
    ClimberNotFound,

    /// Requested log does not exist
    LogNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Transaction kept conflicting after every retry
    ConcurrentModification,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Record store operation failed
    StorageError,

    /// Service is temporarily unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput | ErrorCode::MissingField => StatusCode::BAD_REQUEST,

            ErrorCode::MalformedRecord => StatusCode::UNPROCESSABLE_ENTITY,

            ErrorCode::EntityNotFound
            | ErrorCode::RouteNotFound
            | ErrorCode::ClimberNotFound
            | ErrorCode::LogNotFound => StatusCode::NOT_FOUND,

            ErrorCode::ConcurrentModification => StatusCode::CONFLICT,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError | ErrorCode::StorageError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::MalformedRecord => "Stored record is malformed",
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::RouteNotFound => "Route not found",
            ErrorCode::ClimberNotFound => "Climber not found",
            ErrorCode::LogNotFound => "Log not found",
            ErrorCode::ConcurrentModification => "Concurrent modification detected",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageError => "Record store operation failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    pub fn route_not_found(route_id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::RouteNotFound, format!("Route {} not found", route_id))
    }

    pub fn climber_not_found(climber_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ClimberNotFound,
            format!("Climber {} not found", climber_id),
        )
    }

    pub fn log_not_found(route_id: impl fmt::Display, climber_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::LogNotFound,
            format!("No log by {} on route {}", climber_id, route_id),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<CruxError> for ApiError {
    fn from(err: CruxError) -> Self {
        match err {
            CruxError::Storage(StorageError::NotFound { entity_type, id }) => match entity_type {
                EntityType::Route => ApiError::route_not_found(id),
                EntityType::User => ApiError::climber_not_found(id),
                EntityType::Log => ApiError::new(ErrorCode::LogNotFound, format!("Log {} not found", id)),
            },
            CruxError::Storage(StorageError::Conflict { key }) => {
                tracing::warn!(%key, "Transaction conflict outlived retries");
                ApiError::from_code(ErrorCode::ConcurrentModification)
                    .with_details(serde_json::json!({ "key": key }))
            }
            CruxError::Storage(StorageError::Unavailable { reason }) => {
                tracing::error!(%reason, "Record store unavailable");
                ApiError::service_unavailable(reason)
            }
            CruxError::Storage(e @ (StorageError::TransactionFailed { .. } | StorageError::LockPoisoned)) => {
                // Internal detail stays in the log.
                tracing::error!(error = %e, "Record store operation failed");
                ApiError::from_code(ErrorCode::StorageError)
            }
            CruxError::Validation(e) => validation_error(e),
            CruxError::Config(ConfigError::InvalidValue { field, value, reason }) => {
                ApiError::invalid_input(format!("Invalid value for {}: {} - {}", field, value, reason))
            }
        }
    }
}

fn validation_error(err: ValidationError) -> ApiError {
    let details = match &err {
        ValidationError::InvalidValue { field, reason } => {
            serde_json::json!({ "field": field, "reason": reason })
        }
        ValidationError::DanglingReference { id, referenced_by, .. } => {
            serde_json::json!({ "missing": id, "referenced_by": referenced_by })
        }
    };
    ApiError::new(ErrorCode::MalformedRecord, err.to_string()).with_details(details)
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
