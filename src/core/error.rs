//! Error type system for Atrium
//!
//! This module provides the crate-wide error type with:
//! - The auth/API error taxonomy (validation, unauthorized, forbidden, conflict)
//! - HTTP status code mapping
//! - Stable machine-readable error codes with trace IDs
//!
//! Credential and token failures are deliberately uninformative: callers
//! construct them with uniform messages so a response never reveals which
//! check failed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Main error type for the Atrium backend
#[derive(Debug, thiserror::Error)]
pub enum AtriumError {
    // System-level errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task error: {0}")]
    TaskError(String),

    // Request taxonomy
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: Option<serde_json::Value>,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl AtriumError {
    /// Validation error without field detail
    pub fn validation(message: impl Into<String>) -> Self {
        AtriumError::Validation {
            message: message.into(),
            fields: None,
        }
    }

    /// Validation error with per-field messages
    pub fn validation_fields(message: impl Into<String>, fields: serde_json::Value) -> Self {
        AtriumError::Validation {
            message: message.into(),
            fields: Some(fields),
        }
    }

    /// Uniform rejection for any credential failure (login)
    pub fn bad_credentials() -> Self {
        AtriumError::Unauthorized("Invalid credentials".to_string())
    }

    /// Uniform rejection for any token failure (malformed, bad signature,
    /// expired, wrong purpose, stale epoch, unresolvable user)
    pub fn invalid_token() -> Self {
        AtriumError::Unauthorized("Invalid token".to_string())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AtriumError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AtriumError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AtriumError::Forbidden(_) => StatusCode::FORBIDDEN,
            AtriumError::Conflict(_) => StatusCode::CONFLICT,
            AtriumError::NotFound(_) => StatusCode::NOT_FOUND,
            AtriumError::ConfigError(_)
            | AtriumError::DatabaseError(_)
            | AtriumError::IoError(_)
            | AtriumError::TaskError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the stable error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AtriumError::ConfigError(_) => "ConfigError",
            AtriumError::DatabaseError(_) => "DatabaseError",
            AtriumError::IoError(_) => "IoError",
            AtriumError::TaskError(_) => "TaskError",
            AtriumError::Validation { .. } => "ValidationError",
            AtriumError::Unauthorized(_) => "Unauthorized",
            AtriumError::Forbidden(_) => "Forbidden",
            AtriumError::Conflict(_) => "Conflict",
            AtriumError::NotFound(_) => "NotFound",
        }
    }

    /// Whether the message is safe to surface to the client verbatim.
    /// Internal failures are reported as a generic message instead.
    fn public_message(&self) -> String {
        match self {
            AtriumError::ConfigError(_)
            | AtriumError::DatabaseError(_)
            | AtriumError::IoError(_)
            | AtriumError::TaskError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Error response structure for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional field-level detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Unique trace ID for this error
    pub trace_id: String,
}

impl ErrorResponse {
    /// Create a new error response with a generated trace ID
    pub fn new(error: String, message: String) -> Self {
        Self {
            error,
            message,
            details: None,
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an error response from an AtriumError
    pub fn from_error(error: &AtriumError) -> Self {
        let details = match error {
            AtriumError::Validation { fields, .. } => fields.clone(),
            _ => None,
        };

        Self {
            error: error.error_code().to_string(),
            message: error.public_message(),
            details,
            trace_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Implement IntoResponse for AtriumError to enable automatic error handling in Axum
impl IntoResponse for AtriumError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = ErrorResponse::from_error(&self);

        tracing::error!(
            error_code = self.error_code(),
            trace_id = %error_response.trace_id,
            status_code = %status_code,
            "Request failed: {}",
            self
        );

        (status_code, Json(error_response)).into_response()
    }
}

/// Result type alias for operations that can fail with AtriumError
pub type Result<T> = std::result::Result<T, AtriumError>;
