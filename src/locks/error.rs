//! Lock Errors

/// Errors that can occur while acquiring a lock
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    /// The caller's operation was cancelled before the lock was attempted
    #[error("Lock acquisition cancelled for {0}")]
    Cancelled(String),
}
