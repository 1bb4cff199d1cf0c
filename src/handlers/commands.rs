//! Command results
//!
//! Per-item outcomes reported by batch operations.

use serde::{Deserialize, Serialize};

use crate::aggregate::Product;
use crate::error::AppError;

// =========================================================================
// BatchResult
// =========================================================================

/// Outcome of one item in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Product id; empty when a create failed before an id was assigned
    pub id: String,
    pub success: bool,
    /// Version after the operation (the tombstone version for deletes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    pub fn succeeded(id: impl Into<String>, version: i64) -> Self {
        Self {
            id: id.into(),
            success: true,
            version: Some(version),
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            id: id.into(),
            success: false,
            version: None,
            error: Some(error.to_string()),
        }
    }

    /// Build from a write that returns the committed product
    pub fn from_product(id: &str, result: Result<Product, AppError>) -> Self {
        match result {
            Ok(product) => Self::succeeded(product.id, product.version),
            Err(e) => Self::failed(id, e),
        }
    }
}

/// Count of successful items
pub fn success_count(results: &[BatchResult]) -> usize {
    results.iter().filter(|r| r.success).count()
}
