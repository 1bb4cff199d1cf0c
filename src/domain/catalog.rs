//! Catalog value types
//!
//! Prices, variants, stock levels and market metadata carried by a product.
//! Every type owns its data so cloning a product never shares storage.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::DomainError;

/// Length of an ISO 4217 currency code
const CURRENCY_CODE_LEN: usize = 3;

/// Price for a specific market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub currency: String,
    pub amount: Decimal,
}

impl Price {
    pub fn new(currency: impl Into<String>, amount: Decimal) -> Self {
        Self {
            currency: currency.into(),
            amount,
        }
    }

    /// Validate the price, reporting errors under `path`
    pub fn validate(&self, path: &str) -> Result<(), DomainError> {
        if self.currency.chars().count() != CURRENCY_CODE_LEN {
            return Err(DomainError::validation(
                format!("{path}.currency"),
                format!("must be {CURRENCY_CODE_LEN} characters"),
            ));
        }
        if self.amount < Decimal::ZERO {
            return Err(DomainError::validation(
                format!("{path}.amount"),
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// Inventory for a specific location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub location_id: String,
    pub quantity: i64,
}

impl Stock {
    pub fn validate(&self, path: &str) -> Result<(), DomainError> {
        require(&self.location_id, &format!("{path}.location_id"))?;
        if self.quantity < 0 {
            return Err(DomainError::validation(
                format!("{path}.quantity"),
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// Product variant, e.g. `{"size": "XL", "color": "blue"}`
///
/// Attributes live in a `BTreeMap` so their serialized order is stable,
/// which keeps product hashes reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub sku: String,
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub stock: Vec<Stock>,
}

impl Variant {
    pub fn validate(&self, path: &str) -> Result<(), DomainError> {
        require(&self.id, &format!("{path}.id"))?;
        require(&self.sku, &format!("{path}.sku"))?;
        if self.attributes.is_empty() {
            return Err(DomainError::validation(
                format!("{path}.attributes"),
                "at least one attribute is required",
            ));
        }
        for (i, stock) in self.stock.iter().enumerate() {
            stock.validate(&format!("{path}.stock[{i}]"))?;
        }
        Ok(())
    }
}

/// Market-specific presentation data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketMetadata {
    pub market: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: String,
}

impl MarketMetadata {
    pub fn new(market: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            title: title.into(),
            description: String::new(),
            keywords: String::new(),
        }
    }

    pub fn validate(&self, path: &str) -> Result<(), DomainError> {
        require(&self.market, &format!("{path}.market"))?;
        require(&self.title, &format!("{path}.title"))
    }
}

/// Reject empty or whitespace-only required strings
pub(crate) fn require(value: &str, field: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, "is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_validation() {
        assert!(Price::new("SEK", dec!(199.00)).validate("prices[0]").is_ok());
        assert!(Price::new("EUR", Decimal::ZERO).validate("prices[0]").is_ok());

        let err = Price::new("SE", dec!(1)).validate("prices[2]").unwrap_err();
        assert_eq!(err.field(), "prices[2].currency");

        let err = Price::new("USD", dec!(-0.01)).validate("prices[0]").unwrap_err();
        assert_eq!(err.field(), "prices[0].amount");
    }

    #[test]
    fn test_variant_validation() {
        let mut variant = Variant {
            id: "var_1".to_string(),
            sku: "SKU-1-XL".to_string(),
            attributes: BTreeMap::from([("size".to_string(), "XL".to_string())]),
            stock: vec![Stock {
                location_id: "warehouse-1".to_string(),
                quantity: 4,
            }],
        };
        assert!(variant.validate("variants[0]").is_ok());

        variant.stock[0].quantity = -1;
        let err = variant.validate("variants[0]").unwrap_err();
        assert_eq!(err.field(), "variants[0].stock[0].quantity");

        variant.stock.clear();
        variant.attributes.clear();
        let err = variant.validate("variants[0]").unwrap_err();
        assert_eq!(err.field(), "variants[0].attributes");
    }

    #[test]
    fn test_metadata_validation() {
        assert!(MarketMetadata::new("SE", "Tröja").validate("metadata[0]").is_ok());

        let err = MarketMetadata::new("SE", "  ").validate("metadata[1]").unwrap_err();
        assert_eq!(err.field(), "metadata[1].title");
    }
}
