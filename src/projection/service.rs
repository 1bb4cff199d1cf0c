//! Projection Service
//!
//! The live product table: one current value per product id.
//! This is the read model; history lives in the event store.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::aggregate::Product;

/// Default page size for listings
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page size a listing will return
pub const MAX_PAGE_SIZE: usize = 100;

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Projection Service for the live product table
#[derive(Debug, Clone, Default)]
pub struct ProjectionService {
    products: Arc<RwLock<HashMap<String, Product>>>,
}

impl ProjectionService {
    /// Create an empty ProjectionService
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a newly created product
    pub async fn insert(&self, product: Product) {
        let mut products = self.products.write().await;
        tracing::debug!(product_id = %product.id, "Projection insert");
        products.insert(product.id.clone(), product);
    }

    /// Owned copy of the current value
    pub async fn get(&self, id: &str) -> Option<Product> {
        self.products.read().await.get(id).cloned()
    }

    /// Swap in a whole new value. Readers see either the old or the new
    /// product, never a mix.
    pub async fn replace(&self, product: Product) {
        let mut products = self.products.write().await;
        tracing::debug!(
            product_id = %product.id,
            version = product.version,
            "Projection replace"
        );
        products.insert(product.id.clone(), product);
    }

    /// Remove a product, returning its final value
    pub async fn remove(&self, id: &str) -> Option<Product> {
        let removed = self.products.write().await.remove(id);
        if removed.is_some() {
            tracing::debug!(product_id = %id, "Projection remove");
        }
        removed
    }

    pub async fn count(&self) -> usize {
        self.products.read().await.len()
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Page through products ordered by creation time, then id.
    ///
    /// `page` is 1-based; 0 is treated as 1. A `page_size` of 0 falls back to
    /// [`DEFAULT_PAGE_SIZE`] and anything above [`MAX_PAGE_SIZE`] is clamped.
    pub async fn list(&self, page: usize, page_size: usize) -> Page<Product> {
        let page = page.max(1);
        let page_size = match page_size {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };

        let mut all: Vec<Product> = self.products.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total_items = all.len();
        let total_pages = total_items.div_ceil(page_size);
        let data = all
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        Page {
            data,
            page,
            page_size,
            total_items,
            total_pages,
        }
    }
}
