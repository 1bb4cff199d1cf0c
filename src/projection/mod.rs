//! Projection module
//!
//! Holds the live read model derived from committed events.

mod service;

pub use service::{Page, ProjectionService, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
