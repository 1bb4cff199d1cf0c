//! Aggregate module
//!
//! Aggregate Root pattern implementation for Event Sourcing.

pub mod product;

pub use product::{Product, ProductDraft};

/// Aggregate trait that all aggregates must implement
pub trait Aggregate: Clone {
    /// Get the aggregate type name (used to namespace lock keys)
    fn aggregate_type() -> &'static str;

    /// Get the aggregate ID
    fn id(&self) -> &str;

    /// Get the current version (number of committed mutations)
    fn version(&self) -> i64;

    /// Hash recorded for the current state
    fn last_hash(&self) -> &str;

    /// Hash recomputed from the current semantic state
    fn calculate_hash(&self) -> String;

    /// Check that the recorded hash matches the current state
    fn has_valid_hash(&self) -> bool {
        self.last_hash() == self.calculate_hash()
    }
}

/// Resource key used by the lock manager for an aggregate instance
pub fn lock_key<A: Aggregate>(id: &str) -> String {
    format!("{}:{}", A::aggregate_type(), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_key_is_namespaced() {
        assert_eq!(lock_key::<Product>("prod_1"), "product:prod_1");
    }
}
