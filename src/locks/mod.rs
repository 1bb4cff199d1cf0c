//! Lock module
//!
//! In-process TTL locks used to serialize conflicting writes to one entity.

mod error;
mod manager;

pub use error::LockError;
pub use manager::{LockGuard, LockManager};
