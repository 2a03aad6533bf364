// Pipeline error type returned by every dispatch
use serde_json::{json, Value};
use thiserror::Error;

use crate::auth::TenantError;
use crate::database::record::RecordError;
use crate::database::session::SessionError;
use crate::database::storage::StorageError;
use crate::pipeline::error::ValidationErrors;

/// Errors surfaced to callers of the dispatcher, with status codes and
/// client-friendly messages
#[derive(Debug, Error)]
pub enum DispatchError {
    // 400 Bad Request
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    // 401 Unauthorized
    #[error("Access denied: {0}")]
    AccessDenied(String),

    // 500 Internal Server Error
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("No handler registered for '{0}'")]
    HandlerNotRegistered(&'static str),

    #[error(transparent)]
    Storage(#[from] StorageError),

    // 499 Client Closed Request
    #[error("Request was cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Single-field validation failure
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DispatchError::Validation(ValidationErrors::single(field, message))
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        DispatchError::InvalidOperation(message.into())
    }

    /// Get HTTP-equivalent status code
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::Validation(_) => 400,
            DispatchError::AccessDenied(_) => 401,
            DispatchError::Configuration(_) => 500,
            DispatchError::InvalidOperation(_) => 500,
            DispatchError::HandlerNotRegistered(_) => 500,
            DispatchError::Storage(_) => 500,
            DispatchError::Cancelled => 499,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            DispatchError::Validation(_) => "VALIDATION_ERROR",
            DispatchError::AccessDenied(_) => "ACCESS_DENIED",
            DispatchError::Configuration(_) => "CONFIGURATION_ERROR",
            DispatchError::InvalidOperation(_) => "INVALID_OPERATION",
            DispatchError::HandlerNotRegistered(_) => "HANDLER_NOT_REGISTERED",
            DispatchError::Storage(_) => "INTERNAL_SERVER_ERROR",
            DispatchError::Cancelled => "REQUEST_CANCELLED",
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            DispatchError::Validation(_) => "One or more validation errors occurred".to_string(),
            DispatchError::AccessDenied(msg) => msg.clone(),
            DispatchError::Configuration(_) | DispatchError::HandlerNotRegistered(_) => {
                "The server is not configured to handle this request".to_string()
            }
            DispatchError::InvalidOperation(msg) => msg.clone(),
            DispatchError::Storage(err) => {
                // Don't expose storage internals to clients
                tracing::error!("Storage error: {}", err);
                "An error occurred while processing your request".to_string()
            }
            DispatchError::Cancelled => "The request was cancelled".to_string(),
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            DispatchError::Validation(errors) => json!({
                "error": true,
                "message": self.message(),
                "code": self.error_code(),
                "field_errors": errors
            }),
            _ => json!({
                "error": true,
                "message": self.message(),
                "code": self.error_code()
            }),
        }
    }
}

impl From<TenantError> for DispatchError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::AccessDenied => DispatchError::AccessDenied(err.to_string()),
            TenantError::MissingOwnerClaim(_) | TenantError::InvalidOwnerClaim { .. } => {
                tracing::error!("Tenant configuration error: {}", err);
                DispatchError::Configuration(err.to_string())
            }
        }
    }
}

impl From<RecordError> for DispatchError {
    fn from(err: RecordError) -> Self {
        DispatchError::Storage(StorageError::Record(err))
    }
}

impl From<SessionError> for DispatchError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Tenant(e) => e.into(),
            SessionError::Storage(e) => e.into(),
            SessionError::Record(e) => e.into(),
            SessionError::NoTracking => DispatchError::InvalidOperation(err.to_string()),
            SessionError::NotVisible { .. } => DispatchError::InvalidOperation(err.to_string()),
            SessionError::Cancelled => DispatchError::Cancelled,
        }
    }
}
