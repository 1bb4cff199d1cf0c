//! Event Store module
//!
//! Append-only event log for Event Sourcing.
//! Stores product events in memory and verifies their hash chains.

mod chain;
mod error;
mod repository;

pub use chain::validate_chain;
pub use error::EventStoreError;
pub use repository::EventStore;
