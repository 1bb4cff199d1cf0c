//! Event Publisher
//!
//! In-process fan-out of committed events. Each event type has its own
//! broadcast channel; subscribers receive events published after they
//! subscribed. Delivery is best-effort: a slow receiver lags and a missing
//! receiver is not an error.

use std::collections::HashMap;

use tokio::sync::broadcast;

use crate::domain::{Event, EventType};

/// Default per-type channel capacity
pub const DEFAULT_CAPACITY: usize = 256;

/// Publish/subscribe hub keyed by event type
#[derive(Debug, Clone)]
pub struct EventPublisher {
    channels: HashMap<EventType, broadcast::Sender<Event>>,
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventPublisher {
    /// Create a publisher with one channel of `capacity` per event type
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let channels = EventType::ALL
            .iter()
            .map(|&event_type| (event_type, broadcast::channel(capacity).0))
            .collect();

        Self { channels }
    }

    /// Receive every subsequently published event of `event_type`
    pub fn subscribe(&self, event_type: EventType) -> broadcast::Receiver<Event> {
        self.sender(event_type).subscribe()
    }

    /// Hand an event to its type's subscribers.
    /// Returns the number of receivers it reached; 0 when nobody listens.
    pub fn publish(&self, event: &Event) -> usize {
        let event_type = event.event_type();
        match self.sender(event_type).send(event.clone()) {
            Ok(receivers) => {
                tracing::trace!(
                    event_type = %event_type,
                    entity_id = %event.entity_id,
                    sequence = event.sequence,
                    receivers,
                    "Event published"
                );
                receivers
            }
            Err(_) => 0,
        }
    }

    pub fn subscriber_count(&self, event_type: EventType) -> usize {
        self.sender(event_type).receiver_count()
    }

    fn sender(&self, event_type: EventType) -> &broadcast::Sender<Event> {
        // Every EventType gets a channel in `new`
        &self.channels[&event_type]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Product, ProductDraft};
    use crate::domain::{MarketMetadata, Price};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn product() -> Product {
        let draft = ProductDraft::new("SKU-1", "Sweater")
            .with_price(Price::new("SEK", dec!(100)))
            .with_metadata(MarketMetadata::new("SE", "Tröja"));
        Product::from_draft(draft, Utc::now())
    }

    #[tokio::test]
    async fn test_delivers_by_type() {
        let publisher = EventPublisher::new(8);
        let mut created = publisher.subscribe(EventType::ProductCreated);
        let mut deleted = publisher.subscribe(EventType::ProductDeleted);

        let product = product();
        let event = Event::created(product.clone());
        assert_eq!(publisher.publish(&event), 1);

        assert_eq!(created.recv().await.unwrap(), event);
        assert!(matches!(
            deleted.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        let tombstone = Event::deleted(product);
        publisher.publish(&tombstone);
        assert_eq!(deleted.recv().await.unwrap().version, 2);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let publisher = EventPublisher::default();
        let event = Event::created(product());

        assert_eq!(publisher.subscriber_count(EventType::ProductCreated), 0);
        assert_eq!(publisher.publish(&event), 0);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_and_drop() {
        let publisher = EventPublisher::new(8);
        let mut first = publisher.subscribe(EventType::ProductCreated);
        let second = publisher.subscribe(EventType::ProductCreated);
        assert_eq!(publisher.subscriber_count(EventType::ProductCreated), 2);

        drop(second);
        assert_eq!(publisher.subscriber_count(EventType::ProductCreated), 1);

        let event = Event::created(product());
        assert_eq!(publisher.publish(&event), 1);
        assert_eq!(first.recv().await.unwrap().id, event.id);
    }
}
