//! Event publisher that writes to the tracing log.

use crate::application::ports::{EventPublisher, PublishError};
use crate::domain::events::{DomainEvent, OfferEvent};
use async_trait::async_trait;

/// Logs every event at `info` under the `offer_events` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    /// Creates a tracing publisher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: &OfferEvent) -> Result<(), PublishError> {
        let payload =
            serde_json::to_string(event).map_err(|e| PublishError::Serialization(e.to_string()))?;
        tracing::info!(
            target: "offer_events",
            event_id = %event.event_id(),
            event = event.event_name(),
            offer_id = %event.offer_id(),
            payload = %payload,
            "domain event"
        );
        Ok(())
    }
}
