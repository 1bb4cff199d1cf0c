//! Command Handlers module
//!
//! Orchestrates product writes across the lock manager, event store,
//! projection and publisher, singly and in batches.

mod batch;
mod changes;
mod commands;
mod product_handler;


pub use changes::calculate_changes;
pub use commands::*;
pub use product_handler::{ProductService, ServiceSettings};
