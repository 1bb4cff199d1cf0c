//! Common test utilities

#![allow(dead_code)]

use std::time::Duration;

use rust_decimal_macros::dec;

use product_ledger::domain::{MarketMetadata, Price};
use product_ledger::{ProductDraft, ProductService, ServiceSettings};

/// A valid draft with one price and one market
pub fn sample_draft(sku: &str) -> ProductDraft {
    ProductDraft::new(sku, "Wool sweater")
        .with_description("Knitted in Gotland")
        .with_price(Price::new("SEK", dec!(899.00)))
        .with_metadata(MarketMetadata::new("SE", "Ulltröja"))
}

/// Service with short lock retries so contention tests finish quickly
pub fn test_service() -> ProductService {
    ProductService::new(ServiceSettings {
        lock_retry_attempts: 2,
        lock_retry_backoff: Duration::from_millis(5),
        batch_concurrency: 8,
        ..ServiceSettings::default()
    })
}
