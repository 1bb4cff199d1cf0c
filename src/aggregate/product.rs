//! Product Aggregate
//!
//! The versioned product record whose mutations are tracked by the event
//! log. Every collection the product carries is owned, so `clone()` yields
//! a fully independent copy that can be stored as history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::catalog::require;
use crate::domain::{DomainError, MarketMetadata, Price, Variant};

use super::Aggregate;

/// Prefix of generated product IDs
const ID_PREFIX: &str = "prod_";

/// Client-supplied content for a new product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub sku: String,
    pub base_title: String,
    #[serde(default)]
    pub description: String,
    pub prices: Vec<Price>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    pub metadata: Vec<MarketMetadata>,
}

impl ProductDraft {
    pub fn new(sku: impl Into<String>, base_title: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            base_title: base_title.into(),
            description: String::new(),
            prices: Vec::new(),
            variants: Vec::new(),
            metadata: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_price(mut self, price: Price) -> Self {
        self.prices.push(price);
        self
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn with_metadata(mut self, metadata: MarketMetadata) -> Self {
        self.metadata.push(metadata);
        self
    }

    /// Validate the draft content
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_content(
            &self.sku,
            &self.base_title,
            &self.prices,
            &self.variants,
            &self.metadata,
        )
    }
}

/// Product Aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub base_title: String,
    #[serde(default)]
    pub description: String,
    pub prices: Vec<Price>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    pub metadata: Vec<MarketMetadata>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    /// Version number for optimistic locking
    pub version: i64,
    /// Hash of the current semantic state
    #[serde(default)]
    pub last_hash: String,
}

/// Streaming SHA-256 over length-prefixed fields, so adjacent values can
/// never run together and no intermediate serialization is needed.
struct CanonicalHasher(Sha256);

impl CanonicalHasher {
    fn new() -> Self {
        Self(Sha256::new())
    }

    fn len(&mut self, len: usize) {
        self.0.update((len as u64).to_be_bytes());
    }

    fn str(&mut self, value: &str) {
        self.len(value.len());
        self.0.update(value.as_bytes());
    }

    fn int(&mut self, value: i64) {
        self.0.update(value.to_be_bytes());
    }

    fn finish(self) -> String {
        hex::encode(self.0.finalize())
    }
}

impl Product {
    // =========================================================================
    // Product::from_draft()
    // =========================================================================

    /// Build version 1 of a new product from a draft
    pub fn from_draft(draft: ProductDraft, now: DateTime<Utc>) -> Self {
        let mut product = Self {
            id: format!("{ID_PREFIX}{}", Uuid::new_v4()),
            sku: draft.sku,
            base_title: draft.base_title,
            description: draft.description,
            prices: draft.prices,
            variants: draft.variants,
            metadata: draft.metadata,
            created_at: now,
            updated_at: now,
            version: 1,
            last_hash: String::new(),
        };
        product.last_hash = product.calculate_hash();
        product
    }

    // =========================================================================
    // Hashing & versioning
    // =========================================================================

    /// SHA-256 (hex) over the semantic fields in a fixed order.
    /// Timestamps and the recorded hash are excluded; decimal amounts are
    /// normalized so `899.00` and `899` hash alike.
    pub fn calculate_hash(&self) -> String {
        let mut hasher = CanonicalHasher::new();
        hasher.str(&self.id);
        hasher.str(&self.sku);
        hasher.str(&self.base_title);
        hasher.str(&self.description);

        hasher.len(self.prices.len());
        for price in &self.prices {
            hasher.str(&price.currency);
            hasher.str(&price.amount.normalize().to_string());
        }

        hasher.len(self.variants.len());
        for variant in &self.variants {
            hasher.str(&variant.id);
            hasher.str(&variant.sku);
            // BTreeMap iterates in key order
            hasher.len(variant.attributes.len());
            for (key, value) in &variant.attributes {
                hasher.str(key);
                hasher.str(value);
            }
            hasher.len(variant.stock.len());
            for stock in &variant.stock {
                hasher.str(&stock.location_id);
                hasher.int(stock.quantity);
            }
        }

        hasher.len(self.metadata.len());
        for entry in &self.metadata {
            hasher.str(&entry.market);
            hasher.str(&entry.title);
            hasher.str(&entry.description);
            hasher.str(&entry.keywords);
        }

        hasher.int(self.version);
        hasher.finish()
    }

    /// Increment the version and recompute the hash.
    /// Must run exactly once per committed mutation.
    pub fn bump_version(&mut self) {
        self.version += 1;
        self.last_hash = self.calculate_hash();
    }

    /// Validate the full aggregate
    pub fn validate(&self) -> Result<(), DomainError> {
        require(&self.id, "id")?;
        if self.version < 1 {
            return Err(DomainError::validation("version", "must be at least 1"));
        }
        validate_content(
            &self.sku,
            &self.base_title,
            &self.prices,
            &self.variants,
            &self.metadata,
        )
    }
}

impl Aggregate for Product {
    fn aggregate_type() -> &'static str {
        "product"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn last_hash(&self) -> &str {
        &self.last_hash
    }

    fn calculate_hash(&self) -> String {
        Product::calculate_hash(self)
    }
}

fn validate_content(
    sku: &str,
    base_title: &str,
    prices: &[Price],
    variants: &[Variant],
    metadata: &[MarketMetadata],
) -> Result<(), DomainError> {
    require(sku, "sku")?;
    require(base_title, "base_title")?;

    if prices.is_empty() {
        return Err(DomainError::validation("prices", "at least one price is required"));
    }
    for (i, price) in prices.iter().enumerate() {
        price.validate(&format!("prices[{i}]"))?;
    }

    for (i, variant) in variants.iter().enumerate() {
        variant.validate(&format!("variants[{i}]"))?;
    }

    if metadata.is_empty() {
        return Err(DomainError::validation(
            "metadata",
            "at least one market entry is required",
        ));
    }
    for (i, entry) in metadata.iter().enumerate() {
        entry.validate(&format!("metadata[{i}]"))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn draft() -> ProductDraft {
        ProductDraft::new("SKU-1", "Wool sweater")
            .with_description("Knitted in Gotland")
            .with_price(Price::new("SEK", dec!(899.00)))
            .with_price(Price::new("EUR", dec!(79.90)))
            .with_variant(Variant {
                id: "var_1".to_string(),
                sku: "SKU-1-M".to_string(),
                attributes: BTreeMap::from([
                    ("color".to_string(), "grey".to_string()),
                    ("size".to_string(), "M".to_string()),
                ]),
                stock: Vec::new(),
            })
            .with_metadata(MarketMetadata::new("SE", "Ulltröja"))
    }

    #[test]
    fn test_from_draft() {
        let product = Product::from_draft(draft(), Utc::now());

        assert!(product.id.starts_with("prod_"));
        assert_eq!(product.version, 1);
        assert_eq!(product.created_at, product.updated_at);
        assert_eq!(product.last_hash, product.calculate_hash());
        assert_eq!(product.last_hash.len(), 64);
        assert!(product.has_valid_hash());
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_hash_is_deterministic() {
        let product = Product::from_draft(draft(), Utc::now());
        assert_eq!(product.calculate_hash(), product.calculate_hash());
        assert_eq!(product.clone().calculate_hash(), product.calculate_hash());
    }

    #[test]
    fn test_hash_ignores_timestamps_and_recorded_hash() {
        let product = Product::from_draft(draft(), Utc::now());
        let mut other = product.clone();
        other.created_at = product.created_at - Duration::days(30);
        other.updated_at = product.updated_at + Duration::hours(2);
        other.last_hash = "tampered".to_string();

        assert_eq!(product.calculate_hash(), other.calculate_hash());
    }

    #[test]
    fn test_hash_ignores_decimal_scale() {
        let product = Product::from_draft(draft(), Utc::now());
        let mut other = product.clone();
        other.prices[0].amount = dec!(899);

        assert_eq!(product.calculate_hash(), other.calculate_hash());
    }

    #[test]
    fn test_hash_is_sensitive_to_semantic_fields() {
        let product = Product::from_draft(draft(), Utc::now());
        let original = product.calculate_hash();

        let mutations: Vec<Box<dyn Fn(&mut Product)>> = vec![
            Box::new(|p| p.id.push('x')),
            Box::new(|p| p.sku = "SKU-2".to_string()),
            Box::new(|p| p.base_title = "Cotton sweater".to_string()),
            Box::new(|p| p.description.clear()),
            Box::new(|p| p.prices[1].amount = dec!(89.90)),
            Box::new(|p| p.prices[0].currency = "NOK".to_string()),
            Box::new(|p| {
                p.variants[0]
                    .attributes
                    .insert("size".to_string(), "L".to_string());
            }),
            Box::new(|p| p.metadata[0].keywords = "wool".to_string()),
            Box::new(|p| p.version += 1),
        ];

        for mutate in mutations {
            let mut changed = product.clone();
            mutate(&mut changed);
            assert_ne!(changed.calculate_hash(), original);
        }
    }

    #[test]
    fn test_hash_separates_adjacent_fields() {
        let mut left = Product::from_draft(draft(), Utc::now());
        let mut right = left.clone();

        left.sku = "SKU-1A".to_string();
        left.base_title = "B".to_string();
        right.sku = "SKU-1".to_string();
        right.base_title = "AB".to_string();
        assert_ne!(left.calculate_hash(), right.calculate_hash());

        let mut stocked = Product::from_draft(draft(), Utc::now());
        let baseline = stocked.calculate_hash();
        stocked.variants[0].stock.push(crate::domain::Stock {
            location_id: "wh-1".to_string(),
            quantity: 5,
        });
        let five = stocked.calculate_hash();
        stocked.variants[0].stock[0].quantity = 6;
        assert_ne!(baseline, five);
        assert_ne!(five, stocked.calculate_hash());
    }

    #[test]
    fn test_bump_version() {
        let mut product = Product::from_draft(draft(), Utc::now());
        let before = product.last_hash.clone();

        product.bump_version();

        assert_eq!(product.version, 2);
        assert_ne!(product.last_hash, before);
        assert!(product.has_valid_hash());
    }

    #[test]
    fn test_clone_is_independent() {
        let product = Product::from_draft(draft(), Utc::now());
        let mut copy = product.clone();

        copy.base_title = "Changed".to_string();
        copy.prices.push(Price::new("USD", dec!(10)));
        copy.variants[0].attributes.clear();
        copy.metadata[0].title = "Changed".to_string();

        assert_eq!(product.base_title, "Wool sweater");
        assert_eq!(product.prices.len(), 2);
        assert_eq!(product.variants[0].attributes.len(), 2);
        assert_eq!(product.metadata[0].title, "Ulltröja");
    }

    #[test]
    fn test_validate_reports_first_bad_field() {
        let mut bad = draft();
        bad.prices.clear();
        assert_eq!(bad.validate().unwrap_err().field(), "prices");

        let mut bad = draft();
        bad.metadata.clear();
        assert_eq!(bad.validate().unwrap_err().field(), "metadata");

        let mut bad = draft();
        bad.sku = String::new();
        assert_eq!(bad.validate().unwrap_err().field(), "sku");

        let mut product = Product::from_draft(draft(), Utc::now());
        product.version = 0;
        assert_eq!(product.validate().unwrap_err().field(), "version");
    }

    #[test]
    fn test_deserialize_candidate_without_timestamps() {
        let json = r#"{
            "id": "prod_1",
            "sku": "SKU-1",
            "base_title": "Sweater",
            "prices": [{"currency": "SEK", "amount": "100"}],
            "metadata": [{"market": "SE", "title": "Tröja"}],
            "version": 3
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.version, 3);
        assert!(product.variants.is_empty());
        assert!(product.last_hash.is_empty());
        assert!(product.validate().is_ok());
    }
}
