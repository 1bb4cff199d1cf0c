//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, FromRequest, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::aggregate::{Product, ProductDraft};
use crate::domain::{Event, OperationContext};
use crate::error::AppError;
use crate::handlers::{BatchResult, ProductService};
use crate::projection::{Page, DEFAULT_PAGE_SIZE};

/// Largest page the event feed returns
const MAX_FEED_LIMIT: usize = 1000;

// =========================================================================
// Request/Response types
// =========================================================================

/// JSON body extractor whose rejections render as the standard error body
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size", alias = "size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize)]
pub struct ReplayQuery {
    #[serde(default = "default_from_version")]
    pub from_version: i64,
}

fn default_from_version() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub after_sequence: u64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventsListResponse {
    pub events: Vec<Event>,
    /// Sequence to pass as `after_sequence` for the next page
    pub last_sequence: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<BatchResult>,
    pub succeeded: usize,
    pub failed: usize,
}

impl From<Vec<BatchResult>> for BatchResponse {
    fn from(results: Vec<BatchResult>) -> Self {
        let succeeded = crate::handlers::success_count(&results);
        Self {
            failed: results.len() - succeeded,
            succeeded,
            results,
        }
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<ProductService> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/batch",
            axum::routing::post(batch_create)
                .put(batch_update)
                .delete(batch_delete),
        )
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/events", get(replay_product))
        .route("/events", get(list_events))
}

// =========================================================================
// Products
// =========================================================================

/// GET /products
async fn list_products(
    State(service): State<ProductService>,
    Query(query): Query<ListQuery>,
) -> Json<Page<Product>> {
    Json(service.list(query.page, query.page_size).await)
}

/// POST /products
async fn create_product(
    State(service): State<ProductService>,
    Extension(context): Extension<OperationContext>,
    AppJson(draft): AppJson<ProductDraft>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = service.create(draft, &context).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products/:id
async fn get_product(
    State(service): State<ProductService>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(service.get(&id).await?))
}

/// PUT /products/:id
///
/// The body is the full product as last read, including its `version`.
async fn update_product(
    State(service): State<ProductService>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
    AppJson(mut candidate): AppJson<Product>,
) -> Result<Json<Product>, AppError> {
    if candidate.id.is_empty() {
        candidate.id = id;
    } else if candidate.id != id {
        return Err(AppError::InvalidRequest(format!(
            "Body id {} does not match path id {}",
            candidate.id, id
        )));
    }

    Ok(Json(service.update(candidate, &context).await?))
}

/// DELETE /products/:id
async fn delete_product(
    State(service): State<ProductService>,
    Extension(context): Extension<OperationContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    service.delete(&id, &context).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Batches
// =========================================================================

/// POST /products/batch
async fn batch_create(
    State(service): State<ProductService>,
    Extension(context): Extension<OperationContext>,
    AppJson(drafts): AppJson<Vec<ProductDraft>>,
) -> Json<BatchResponse> {
    Json(service.batch_create(drafts, &context).await.into())
}

/// PUT /products/batch
async fn batch_update(
    State(service): State<ProductService>,
    Extension(context): Extension<OperationContext>,
    AppJson(candidates): AppJson<Vec<Product>>,
) -> Json<BatchResponse> {
    Json(service.batch_update(candidates, &context).await.into())
}

/// DELETE /products/batch
async fn batch_delete(
    State(service): State<ProductService>,
    Extension(context): Extension<OperationContext>,
    AppJson(ids): AppJson<Vec<String>>,
) -> Json<BatchResponse> {
    Json(service.batch_delete(ids, &context).await.into())
}

// =========================================================================
// History
// =========================================================================

/// GET /products/:id/events
async fn replay_product(
    State(service): State<ProductService>,
    Path(id): Path<String>,
    Query(query): Query<ReplayQuery>,
) -> Result<Json<Vec<Event>>, AppError> {
    Ok(Json(service.replay(&id, query.from_version).await?))
}

/// GET /events
async fn list_events(
    State(service): State<ProductService>,
    Query(query): Query<EventsQuery>,
) -> Json<EventsListResponse> {
    let limit = query.limit.clamp(1, MAX_FEED_LIMIT);
    let events = service.events_after(query.after_sequence, limit).await;
    let last_sequence = events.last().map(|e| e.sequence);

    Json(EventsListResponse {
        events,
        last_sequence,
    })
}
