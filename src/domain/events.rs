//! Domain Events
//!
//! Event definitions for Event Sourcing.
//! Events are immutable facts that have happened in the system. Each payload
//! owns its product snapshot; no event ever refers to a live record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::Product;

/// Event type, used for subscription routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "product.created")]
    ProductCreated,
    #[serde(rename = "product.updated")]
    ProductUpdated,
    #[serde(rename = "product.deleted")]
    ProductDeleted,
}

impl EventType {
    pub const ALL: [EventType; 3] = [
        EventType::ProductCreated,
        EventType::ProductUpdated,
        EventType::ProductDeleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ProductCreated => "product.created",
            EventType::ProductUpdated => "product.updated",
            EventType::ProductDeleted => "product.deleted",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single field-level difference recorded by an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<serde_json::Value>,
    pub new_value: serde_json::Value,
}

/// Product event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProductEvent {
    /// Product was created; there is no previous hash
    Created { snapshot: Product },

    /// Product was updated
    Updated {
        snapshot: Product,
        prev_hash: String,
        changes: Vec<FieldChange>,
    },

    /// Product was deleted; the snapshot is the final live state
    Deleted { snapshot: Product, prev_hash: String },
}

impl ProductEvent {
    /// Get the event type
    pub fn event_type(&self) -> EventType {
        match self {
            ProductEvent::Created { .. } => EventType::ProductCreated,
            ProductEvent::Updated { .. } => EventType::ProductUpdated,
            ProductEvent::Deleted { .. } => EventType::ProductDeleted,
        }
    }

    /// Action name as recorded in the payload
    pub fn action(&self) -> &'static str {
        match self {
            ProductEvent::Created { .. } => "created",
            ProductEvent::Updated { .. } => "updated",
            ProductEvent::Deleted { .. } => "deleted",
        }
    }

    /// Owned snapshot of the product at this point in history
    pub fn snapshot(&self) -> &Product {
        match self {
            ProductEvent::Created { snapshot }
            | ProductEvent::Updated { snapshot, .. }
            | ProductEvent::Deleted { snapshot, .. } => snapshot,
        }
    }

    /// Hash of the product before this event; empty for creation
    pub fn prev_hash(&self) -> &str {
        match self {
            ProductEvent::Created { .. } => "",
            ProductEvent::Updated { prev_hash, .. } | ProductEvent::Deleted { prev_hash, .. } => {
                prev_hash
            }
        }
    }

    /// Field changes; empty unless this is an update
    pub fn changes(&self) -> &[FieldChange] {
        match self {
            ProductEvent::Updated { changes, .. } => changes,
            _ => &[],
        }
    }

    pub fn is_creation(&self) -> bool {
        matches!(self, ProductEvent::Created { .. })
    }
}

/// A recorded event in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub entity_id: String,
    /// Aggregate version this event produced
    pub version: i64,
    /// Global sequence number, assigned by the event store on append
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: ProductEvent,
}

impl Event {
    /// Creation event for a version 1 product
    pub fn created(snapshot: Product) -> Self {
        Self::new(snapshot.version, ProductEvent::Created { snapshot })
    }

    /// Update event for a product that has already been bumped
    pub fn updated(snapshot: Product, prev_hash: String, changes: Vec<FieldChange>) -> Self {
        Self::new(
            snapshot.version,
            ProductEvent::Updated {
                snapshot,
                prev_hash,
                changes,
            },
        )
    }

    /// Deletion event; the version is one past the final live version
    pub fn deleted(snapshot: Product) -> Self {
        let version = snapshot.version + 1;
        let prev_hash = snapshot.last_hash.clone();
        Self::new(version, ProductEvent::Deleted { snapshot, prev_hash })
    }

    fn new(version: i64, payload: ProductEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id: payload.snapshot().id.clone(),
            version,
            sequence: 0,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    pub fn prev_hash(&self) -> &str {
        self.payload.prev_hash()
    }

    pub fn snapshot(&self) -> &Product {
        self.payload.snapshot()
    }
}
