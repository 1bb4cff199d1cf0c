//! Product Handler
//!
//! Orchestrates every write: validation, per-product locking, optimistic
//! version checks, event append, projection commit and publication.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::aggregate::{lock_key, Product, ProductDraft};
use crate::domain::{Event, EventType, OperationContext};
use crate::error::{AppError, AppResult};
use crate::event_store::{validate_chain, EventStore};
use crate::locks::{LockError, LockGuard, LockManager};
use crate::projection::{Page, ProjectionService};
use crate::publisher::EventPublisher;

use super::changes::calculate_changes;

/// Tunables for the write path
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// TTL of the per-product lock held during update/delete
    pub lock_ttl: Duration,
    /// Attempts before reporting lock contention
    pub lock_retry_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * lock_retry_backoff`
    pub lock_retry_backoff: Duration,
    /// Maximum concurrently running items per batch
    pub batch_concurrency: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(10),
            lock_retry_attempts: 3,
            lock_retry_backoff: Duration::from_millis(50),
            batch_concurrency: 16,
        }
    }
}

// =========================================================================
// ProductService
// =========================================================================

/// Write orchestrator and query facade for products.
///
/// Cheap to clone; clones share all state, including the event store that
/// assigns global sequence numbers.
#[derive(Debug, Clone)]
pub struct ProductService {
    projection: ProjectionService,
    event_store: EventStore,
    locks: Arc<LockManager>,
    publisher: EventPublisher,
    settings: ServiceSettings,
}

impl Default for ProductService {
    fn default() -> Self {
        Self::new(ServiceSettings::default())
    }
}

impl ProductService {
    pub fn new(settings: ServiceSettings) -> Self {
        Self {
            projection: ProjectionService::new(),
            event_store: EventStore::new(),
            locks: Arc::new(LockManager::new()),
            publisher: EventPublisher::default(),
            settings,
        }
    }

    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_lock_manager(mut self, locks: Arc<LockManager>) -> Self {
        self.locks = locks;
        self
    }

    pub fn locks(&self) -> &Arc<LockManager> {
        &self.locks
    }

    pub fn event_store(&self) -> &EventStore {
        &self.event_store
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current value of a product
    pub async fn get(&self, id: &str) -> AppResult<Product> {
        self.projection
            .get(id)
            .await
            .ok_or_else(|| AppError::ProductNotFound(id.to_string()))
    }

    /// Page through live products, oldest first
    pub async fn list(&self, page: usize, page_size: usize) -> Page<Product> {
        self.projection.list(page, page_size).await
    }

    /// History of a product from `from_version` on, verified before return.
    /// A product with no recorded events yields an empty list.
    pub async fn replay(&self, id: &str, from_version: i64) -> AppResult<Vec<Event>> {
        let events = self.event_store.query(id, from_version).await;
        validate_chain(&events)?;

        tracing::debug!(
            product_id = %id,
            from_version,
            events = events.len(),
            "Replayed product history"
        );

        Ok(events)
    }

    /// Global event feed ordered by sequence
    pub async fn events_after(&self, after_sequence: u64, limit: usize) -> Vec<Event> {
        self.event_store.events_after(after_sequence, limit).await
    }

    pub fn subscribe(&self, event_type: EventType) -> tokio::sync::broadcast::Receiver<Event> {
        self.publisher.subscribe(event_type)
    }

    // =========================================================================
    // create
    // =========================================================================

    /// Create version 1 of a new product
    pub async fn create(
        &self,
        draft: ProductDraft,
        context: &OperationContext,
    ) -> AppResult<Product> {
        draft.validate()?;

        let product = Product::from_draft(draft, Utc::now());
        let published = self
            .event_store
            .append(Event::created(product.clone()))
            .await?;
        self.projection.insert(product.clone()).await;

        tracing::info!(
            product_id = %product.id,
            sku = %product.sku,
            sequence = published.sequence,
            correlation_id = ?context.correlation_id,
            "Product created"
        );

        self.publisher.publish(&published);
        Ok(product)
    }

    // =========================================================================
    // update
    // =========================================================================

    /// Replace a product's content.
    ///
    /// `candidate.version` must equal the current version; the committed
    /// product carries the next version.
    pub async fn update(
        &self,
        candidate: Product,
        context: &OperationContext,
    ) -> AppResult<Product> {
        candidate.validate()?;

        let guard = self.lock_product(&candidate.id, context).await?;

        let current = self.get(&candidate.id).await?;
        if candidate.version != current.version {
            tracing::debug!(
                product_id = %current.id,
                expected = candidate.version,
                found = current.version,
                "Version conflict"
            );
            return Err(AppError::VersionConflict {
                id: current.id,
                expected: candidate.version,
                found: current.version,
            });
        }

        let mut next = candidate;
        next.created_at = current.created_at;
        next.updated_at = Utc::now();
        next.bump_version();

        let changes = calculate_changes(&current, &next);
        let event = Event::updated(next.clone(), current.last_hash.clone(), changes);

        let published = self.event_store.append(event).await?;
        self.projection.replace(next.clone()).await;

        // Publish before releasing so subscribers see this product's
        // versions in order
        self.publisher.publish(&published);
        drop(guard);

        tracing::info!(
            product_id = %next.id,
            version = next.version,
            changes = published.payload.changes().len(),
            correlation_id = ?context.correlation_id,
            "Product updated"
        );

        Ok(next)
    }

    // =========================================================================
    // delete
    // =========================================================================

    /// Remove a product, recording a tombstone event
    pub async fn delete(&self, id: &str, context: &OperationContext) -> AppResult<()> {
        self.remove(id, context).await.map(|_| ())
    }

    /// Delete and return the tombstone version
    pub(super) async fn remove(&self, id: &str, context: &OperationContext) -> AppResult<i64> {
        let guard = self.lock_product(id, context).await?;

        let current = self.get(id).await?;
        let published = self.event_store.append(Event::deleted(current)).await?;
        self.projection.remove(id).await;

        self.publisher.publish(&published);
        drop(guard);

        tracing::info!(
            product_id = %id,
            version = published.version,
            correlation_id = ?context.correlation_id,
            "Product deleted"
        );

        Ok(published.version)
    }

    // =========================================================================
    // Locking with retry
    // =========================================================================

    /// Take the product's lock, retrying with linear backoff.
    /// Exhausted attempts are lock contention, not a version conflict.
    async fn lock_product(&self, id: &str, context: &OperationContext) -> AppResult<LockGuard> {
        let key = lock_key::<Product>(id);
        let attempts = self.settings.lock_retry_attempts.max(1);

        for attempt in 0..attempts {
            if let Some(guard) =
                self.locks
                    .try_lock(&key, self.settings.lock_ttl, &context.cancellation)?
            {
                return Ok(guard);
            }

            if attempt + 1 < attempts {
                let delay = self.settings.lock_retry_backoff * (attempt + 1);
                tracing::warn!(
                    "Lock contention on {}, retrying (attempt {}/{})",
                    key,
                    attempt + 1,
                    attempts
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = context.cancellation.cancelled() => {
                        return Err(LockError::Cancelled(key).into());
                    }
                }
            }
        }

        tracing::warn!(key = %key, attempts, "Lock contention, giving up");
        Err(AppError::LockContention(id.to_string()))
    }
}
