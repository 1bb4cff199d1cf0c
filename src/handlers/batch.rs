//! Batch Handler
//!
//! Runs one write per item on its own task. Items never affect each other:
//! a failure (or a panic) is recorded in that item's result and the rest
//! carry on. Results line up index-for-index with the input.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::aggregate::{Product, ProductDraft};
use crate::domain::OperationContext;

use super::{success_count, BatchResult, ProductService};

impl ProductService {
    /// Create every draft independently
    pub async fn batch_create(
        &self,
        drafts: Vec<ProductDraft>,
        context: &OperationContext,
    ) -> Vec<BatchResult> {
        let context = context.clone();
        self.run_batch("create", drafts, |_| String::new(), move |service, draft| {
            let context = context.clone();
            async move { BatchResult::from_product("", service.create(draft, &context).await) }
        })
        .await
    }

    /// Update every candidate independently
    pub async fn batch_update(
        &self,
        candidates: Vec<Product>,
        context: &OperationContext,
    ) -> Vec<BatchResult> {
        let context = context.clone();
        self.run_batch(
            "update",
            candidates,
            |candidate| candidate.id.clone(),
            move |service, candidate| {
                let context = context.clone();
                async move {
                    let id = candidate.id.clone();
                    BatchResult::from_product(&id, service.update(candidate, &context).await)
                }
            },
        )
        .await
    }

    /// Delete every id independently
    pub async fn batch_delete(
        &self,
        ids: Vec<String>,
        context: &OperationContext,
    ) -> Vec<BatchResult> {
        let context = context.clone();
        self.run_batch("delete", ids, |id| id.clone(), move |service, id| {
            let context = context.clone();
            async move {
                match service.remove(&id, &context).await {
                    Ok(version) => BatchResult::succeeded(id, version),
                    Err(e) => BatchResult::failed(id, e),
                }
            }
        })
        .await
    }

    /// Spawn `work` for each item, at most `batch_concurrency` at a time,
    /// and collect results in input order.
    async fn run_batch<T, F, Fut>(
        &self,
        operation: &'static str,
        items: Vec<T>,
        item_id: fn(&T) -> String,
        work: F,
    ) -> Vec<BatchResult>
    where
        T: Send + 'static,
        F: Fn(ProductService, T) -> Fut,
        Fut: Future<Output = BatchResult> + Send + 'static,
    {
        let total = items.len();
        let permits = Arc::new(Semaphore::new(self.settings().batch_concurrency.max(1)));

        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let id = item_id(&item);
                let permits = Arc::clone(&permits);
                let task = work(self.clone(), item);
                let handle = tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    task.await
                });
                (id, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(total);
        for (id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(operation, item_id = %id, error = %e, "Batch worker failed");
                    BatchResult::failed(id, format!("worker failed: {}", e))
                }
            };
            results.push(result);
        }

        tracing::info!(
            operation,
            total,
            succeeded = success_count(&results),
            "Batch completed"
        );

        results
    }
}
