//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Domain-specific errors
///
/// These errors represent invalid product input. They are independent of the
/// web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field failed validation
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },
}

impl DomainError {
    /// Create a validation error for a field path such as `prices[0].currency`
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The offending field path
    pub fn field(&self) -> &str {
        match self {
            Self::Validation { field, .. } => field,
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
