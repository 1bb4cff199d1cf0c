//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::event_store::EventStoreError;
use crate::locks::LockError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Version conflict for {id}: expected {expected}, found {found}")]
    VersionConflict {
        id: String,
        expected: i64,
        found: i64,
    },

    #[error("Lock contention on {0}: could not acquire lock")]
    LockContention(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] crate::domain::DomainError),

    // Server errors (5xx)
    #[error(transparent)]
    EventStore(#[from] EventStoreError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::VersionConflict { .. } | AppError::LockContention(_)
        )
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::ProductNotFound(_) => "product_not_found",
            AppError::VersionConflict { .. } => "version_conflict",
            AppError::LockContention(_) => "lock_contention",
            AppError::Domain(_) => "validation_error",
            AppError::EventStore(EventStoreError::ChainIntegrity { .. }) => "chain_integrity_violation",
            AppError::EventStore(EventStoreError::DuplicateVersion { .. }) => "duplicate_version",
            AppError::Lock(LockError::Cancelled(_)) => "cancelled",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) | AppError::Domain(_) => StatusCode::BAD_REQUEST,
            AppError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            AppError::VersionConflict { .. } => StatusCode::CONFLICT,
            AppError::LockContention(_) => StatusCode::LOCKED,
            AppError::EventStore(EventStoreError::DuplicateVersion { .. }) => StatusCode::CONFLICT,
            AppError::Lock(LockError::Cancelled(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::EventStore(EventStoreError::ChainIntegrity { .. })
            | AppError::Internal(_)
            | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let details = match &self {
            AppError::ProductNotFound(id) | AppError::LockContention(id) => Some(id.clone()),
            AppError::VersionConflict {
                expected, found, ..
            } => Some(format!("expected {}, found {}", expected, found)),
            AppError::Domain(domain_err) => Some(domain_err.field().to_string()),
            AppError::EventStore(e @ EventStoreError::ChainIntegrity { .. }) => {
                tracing::error!(error = %e, "Chain integrity violation surfaced to client");
                e.offending_versions().map(|(prev, version)| match prev {
                    Some(prev) => format!("versions {} -> {}", prev, version),
                    None => format!("version {}", version),
                })
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                None
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                None
            }
            _ => None,
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
