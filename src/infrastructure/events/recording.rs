//! # Recording Event Publisher
//!
//! Keeps published events in memory for assertions.

use crate::application::ports::{EventPublisher, PublishError};
use crate::domain::events::{DomainEvent, OfferEvent};
use crate::domain::value_objects::OfferId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// In-memory event publisher for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventPublisher {
    events: Arc<Mutex<Vec<OfferEvent>>>,
}

impl RecordingEventPublisher {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every published event, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<OfferEvent> {
        self.events.lock().clone()
    }

    /// Returns the names of every published event, oldest first.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.event_name()).collect()
    }

    /// Returns the events concerning `offer_id`.
    #[must_use]
    pub fn events_for(&self, offer_id: OfferId) -> Vec<OfferEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.offer_id() == offer_id)
            .cloned()
            .collect()
    }

    /// Returns the number of published events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: &OfferEvent) -> Result<(), PublishError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entities::OfferBuilder;
    use crate::domain::events::{OfferSubmitted, OfferWithdrawn};
    use crate::domain::value_objects::{Amount, PropertyId, Timestamp, UserId};

    #[tokio::test]
    async fn records_in_order() {
        let offer = OfferBuilder::new(
            PropertyId::new("p1"),
            UserId::new("b"),
            UserId::new("s"),
            Amount::from_units(10).unwrap(),
        )
        .try_build()
        .unwrap();
        let publisher = RecordingEventPublisher::new();

        publisher
            .publish(&OfferEvent::Submitted(OfferSubmitted::new(&offer)))
            .await
            .unwrap();
        publisher
            .publish(&OfferEvent::Withdrawn(OfferWithdrawn::new(
                &offer,
                Timestamp::now(),
            )))
            .await
            .unwrap();

        assert_eq!(publisher.event_names(), vec!["OfferSubmitted", "OfferWithdrawn"]);
        assert_eq!(publisher.events_for(offer.id()).len(), 2);
        assert!(publisher.events_for(OfferId::new_v4()).is_empty());
    }
}
