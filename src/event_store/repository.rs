//! Event Store Repository
//!
//! In-memory append-only event log.
//! Events are stored per entity in ascending version order and are
//! independently addressable by their global sequence number. Sequence
//! numbers are assigned under the write lock, so a reader never observes
//! sequence N+1 without N.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::aggregate::Product;
use crate::domain::Event;

use super::EventStoreError;

/// Log contents guarded by a single lock
#[derive(Debug, Default)]
struct EventLog {
    /// Events per entity, ascending by version
    by_entity: HashMap<String, Vec<Event>>,
    /// Global sequence → (entity_id, version)
    by_sequence: BTreeMap<u64, (String, i64)>,
    /// Last assigned global sequence
    last_sequence: u64,
}

impl EventLog {
    fn find(&self, entity_id: &str, version: i64) -> Option<&Event> {
        let events = self.by_entity.get(entity_id)?;
        events
            .binary_search_by_key(&version, |e| e.version)
            .ok()
            .map(|idx| &events[idx])
    }
}

/// Event Store for appending and querying events
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    inner: Arc<RwLock<EventLog>>,
}

impl EventStore {
    /// Create an empty EventStore
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // append
    // =========================================================================

    /// Append an event, stamping it with the next global sequence.
    ///
    /// The event is moved into the log, so no caller retains a handle to the
    /// stored value; the returned copy carries the assigned sequence. A
    /// rejected append does not consume a sequence number.
    pub async fn append(&self, mut event: Event) -> Result<Event, EventStoreError> {
        let mut guard = self.inner.write().await;
        let log = &mut *guard;

        let events = log.by_entity.entry(event.entity_id.clone()).or_default();
        let idx = match events.binary_search_by_key(&event.version, |e| e.version) {
            Ok(_) => {
                return Err(EventStoreError::DuplicateVersion {
                    entity_id: event.entity_id,
                    version: event.version,
                })
            }
            Err(idx) => idx,
        };

        log.last_sequence += 1;
        event.sequence = log.last_sequence;
        let recorded = event.clone();

        tracing::debug!(
            entity_id = %event.entity_id,
            version = event.version,
            sequence = event.sequence,
            event_type = %event.event_type(),
            "Event appended"
        );

        log.by_sequence
            .insert(event.sequence, (event.entity_id.clone(), event.version));
        events.insert(idx, event);

        Ok(recorded)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Owned copies of every event for `entity_id` with
    /// `version >= from_version`, ascending by version
    pub async fn query(&self, entity_id: &str, from_version: i64) -> Vec<Event> {
        let log = self.inner.read().await;
        let Some(events) = log.by_entity.get(entity_id) else {
            return Vec::new();
        };

        let start = events.partition_point(|e| e.version < from_version);
        events[start..].to_vec()
    }

    /// Look up a single event by its global sequence number
    pub async fn get_by_sequence(&self, sequence: u64) -> Option<Event> {
        let log = self.inner.read().await;
        let (entity_id, version) = log.by_sequence.get(&sequence)?;
        log.find(entity_id, *version).cloned()
    }

    /// Events with `sequence > after`, ascending by sequence
    pub async fn events_after(&self, after: u64, limit: usize) -> Vec<Event> {
        let log = self.inner.read().await;
        log.by_sequence
            .range(after.saturating_add(1)..)
            .filter_map(|(_, (entity_id, version))| log.find(entity_id, *version))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Snapshot and version of the newest event for an entity
    pub async fn latest_snapshot(&self, entity_id: &str) -> Option<(Product, i64)> {
        let log = self.inner.read().await;
        log.by_entity
            .get(entity_id)?
            .last()
            .map(|e| (e.snapshot().clone(), e.version))
    }

    /// Total number of recorded events
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.by_sequence.len()
    }
}
