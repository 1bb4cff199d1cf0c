//! Domain module
//!
//! Core domain types and business logic.

pub mod catalog;
pub mod context;
pub mod error;
pub mod events;

pub use catalog::{MarketMetadata, Price, Stock, Variant};
pub use context::{CancellationSignal, OperationContext};
pub use error::DomainError;
pub use events::{Event, EventType, FieldChange, ProductEvent};
