//! Hash chain verification
//!
//! Checks that one entity's history is contiguous and that every event links
//! to the hash of the snapshot recorded by its predecessor.

use crate::domain::Event;

use super::EventStoreError;

/// Verify a version-ordered sequence of events for a single entity.
///
/// Fails on the first violation with the offending version pair; the
/// history is never repaired or truncated.
pub fn validate_chain(events: &[Event]) -> Result<(), EventStoreError> {
    let Some(first) = events.first() else {
        return Ok(());
    };

    if !first.payload.is_creation() && first.prev_hash().is_empty() {
        return Err(violation(
            first,
            None,
            "non-creation event at start of range has empty prev_hash",
        ));
    }

    for pair in events.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);

        if curr.entity_id != first.entity_id {
            return Err(violation(
                curr,
                Some(prev.version),
                format!("event belongs to {} not {}", curr.entity_id, first.entity_id),
            ));
        }

        if curr.version != prev.version + 1 {
            return Err(violation(
                curr,
                Some(prev.version),
                format!("expected version {}", prev.version + 1),
            ));
        }

        let expected = &prev.snapshot().last_hash;
        if curr.prev_hash() != expected {
            return Err(violation(
                curr,
                Some(prev.version),
                format!(
                    "prev_hash {} does not match predecessor hash {}",
                    display_hash(curr.prev_hash()),
                    display_hash(expected)
                ),
            ));
        }
    }

    Ok(())
}

fn violation(event: &Event, previous_version: Option<i64>, reason: impl Into<String>) -> EventStoreError {
    let reason = reason.into();
    tracing::error!(
        entity_id = %event.entity_id,
        previous_version = ?previous_version,
        version = event.version,
        reason = %reason,
        "Event chain integrity violated"
    );
    EventStoreError::ChainIntegrity {
        entity_id: event.entity_id.clone(),
        previous_version,
        version: event.version,
        reason,
    }
}

fn display_hash(hash: &str) -> &str {
    if hash.is_empty() {
        "<empty>"
    } else {
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Product, ProductDraft};
    use crate::domain::{MarketMetadata, Price, ProductEvent};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    /// Build a valid created → updated → updated → deleted history
    fn history() -> Vec<Event> {
        let draft = ProductDraft::new("SKU-1", "Sweater")
            .with_price(Price::new("SEK", dec!(100)))
            .with_metadata(MarketMetadata::new("SE", "Tröja"));
        let mut product = Product::from_draft(draft, Utc::now());
        let mut events = vec![Event::created(product.clone())];

        for title in ["Sweater v2", "Sweater v3"] {
            let prev_hash = product.last_hash.clone();
            product.base_title = title.to_string();
            product.bump_version();
            events.push(Event::updated(product.clone(), prev_hash, Vec::new()));
        }

        events.push(Event::deleted(product));
        events
    }

    #[test]
    fn test_valid_chain() {
        let events = history();
        assert_eq!(
            events.iter().map(|e| e.version).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert!(validate_chain(&events).is_ok());
    }

    #[test]
    fn test_empty_chain_is_valid() {
        assert!(validate_chain(&[]).is_ok());
    }

    #[test]
    fn test_range_starting_mid_history_is_valid() {
        let events = history();
        assert!(validate_chain(&events[1..]).is_ok());
        assert!(validate_chain(&events[3..]).is_ok());
    }

    #[test]
    fn test_non_creation_start_requires_prev_hash() {
        let mut events = history();
        if let ProductEvent::Updated { prev_hash, .. } = &mut events[1].payload {
            prev_hash.clear();
        }

        let err = validate_chain(&events[1..]).unwrap_err();
        assert_eq!(err.offending_versions(), Some((None, 2)));
    }

    #[test]
    fn test_version_gap_detected() {
        let mut events = history();
        events.remove(2);

        let err = validate_chain(&events).unwrap_err();
        assert!(err.is_chain_integrity_violation());
        assert_eq!(err.offending_versions(), Some((Some(2), 4)));
    }

    #[test]
    fn test_tampered_snapshot_detected() {
        let mut events = history();
        // Rewrite history: the recorded hash of version 2 no longer matches
        // what version 3 linked to.
        if let ProductEvent::Updated { snapshot, .. } = &mut events[1].payload {
            snapshot.base_title = "Forged".to_string();
            snapshot.last_hash = snapshot.calculate_hash();
        }

        let err = validate_chain(&events).unwrap_err();
        assert_eq!(err.offending_versions(), Some((Some(2), 3)));
    }

    #[test]
    fn test_tampered_prev_hash_detected() {
        let mut events = history();
        if let ProductEvent::Deleted { prev_hash, .. } = &mut events[3].payload {
            *prev_hash = "0".repeat(64);
        }

        let err = validate_chain(&events).unwrap_err();
        assert_eq!(err.offending_versions(), Some((Some(3), 4)));
    }

    #[test]
    fn test_mixed_entities_rejected() {
        let mut events = history();
        events[2].entity_id = "prod_other".to_string();

        let err = validate_chain(&events).unwrap_err();
        assert!(err.to_string().contains("prod_other"));
    }
}
