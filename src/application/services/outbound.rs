//! # Outbound Dispatch
//!
//! Delivers notifications and domain events after a state change commits.
//!
//! Delivery is at-most-once: each call is bounded by a timeout, and any
//! failure is logged and dropped. Nothing here can fail the operation that
//! produced the messages.

use crate::application::ports::{EventPublisher, Notification, Notifier};
use crate::domain::events::{DomainEvent, OfferEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Messages produced by one committed operation.
#[derive(Debug, Clone, Default)]
pub struct Outbound {
    /// Notifications to deliver.
    pub notifications: Vec<Notification>,
    /// Domain events to publish.
    pub events: Vec<OfferEvent>,
}

impl Outbound {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a notification.
    #[must_use]
    pub fn notify(mut self, notification: Notification) -> Self {
        self.notifications.push(notification);
        self
    }

    /// Adds a domain event.
    #[must_use]
    pub fn event(mut self, event: OfferEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Returns true if there is nothing to send.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && self.events.is_empty()
    }
}

/// Sends [`Outbound`] batches to the notifier and the event publisher.
#[derive(Debug, Clone)]
pub struct OutboundDispatcher {
    notifier: Arc<dyn Notifier>,
    publisher: Arc<dyn EventPublisher>,
    timeout: Duration,
}

impl OutboundDispatcher {
    /// Creates a dispatcher with a per-message timeout.
    #[must_use]
    pub fn new(
        notifier: Arc<dyn Notifier>,
        publisher: Arc<dyn EventPublisher>,
        timeout: Duration,
    ) -> Self {
        Self {
            notifier,
            publisher,
            timeout,
        }
    }

    /// Delivers every message in the batch. Failures are logged only.
    pub async fn dispatch(&self, outbound: Outbound) {
        for event in &outbound.events {
            match timeout(self.timeout, self.publisher.publish(event)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(
                    error = %e,
                    event = event.event_name(),
                    offer_id = %event.offer_id(),
                    "domain event publish failed"
                ),
                Err(_) => tracing::warn!(
                    event = event.event_name(),
                    offer_id = %event.offer_id(),
                    "domain event publish timed out"
                ),
            }
        }

        for notification in &outbound.notifications {
            match timeout(self.timeout, self.notifier.notify(notification)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(
                    error = %e,
                    kind = %notification.kind,
                    recipient = %notification.recipient,
                    offer_id = %notification.offer_id,
                    "notification delivery failed"
                ),
                Err(_) => tracing::warn!(
                    kind = %notification.kind,
                    recipient = %notification.recipient,
                    offer_id = %notification.offer_id,
                    "notification delivery timed out"
                ),
            }
        }
    }
}
