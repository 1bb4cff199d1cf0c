//! product_ledger Library
//!
//! Event-sourced product store: versioned aggregates, hash-chained history,
//! per-product TTL locks and concurrent batch writes.

pub mod aggregate;
pub mod api;
pub mod domain;
pub mod event_store;
pub mod handlers;
pub mod jobs;
pub mod locks;
pub mod projection;
pub mod publisher;

pub mod config;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorResponse};
pub use aggregate::{Product, ProductDraft};
pub use domain::{DomainError, Event, EventType, OperationContext, ProductEvent};
pub use handlers::{BatchResult, ProductService, ServiceSettings};
