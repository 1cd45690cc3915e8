//! # Domain Event Trait
//!
//! Base trait for all domain events.
//!
//! Domain events are the engine's outbound record of what happened. They are
//! published only after the state change they describe has been committed.

use crate::domain::value_objects::timestamp::Timestamp;
use crate::domain::value_objects::{EventId, OfferId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of domain event.
///
/// Categorizes events by their domain area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Offer lifecycle events.
    Offer,
    /// Transaction creation events.
    Transaction,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offer => write!(f, "OFFER"),
            Self::Transaction => write!(f, "TRANSACTION"),
        }
    }
}

/// Trait for all domain events.
///
/// # Required Methods
///
/// - [`event_id`](DomainEvent::event_id) - Unique identifier for this event
/// - [`offer_id`](DomainEvent::offer_id) - The offer this event relates to
/// - [`timestamp`](DomainEvent::timestamp) - When the event occurred
/// - [`event_type`](DomainEvent::event_type) - Category of the event
/// - [`event_name`](DomainEvent::event_name) - Human-readable event name
pub trait DomainEvent: Send + Sync + fmt::Debug {
    /// Returns the unique identifier for this event.
    fn event_id(&self) -> EventId;

    /// Returns the offer this event relates to.
    fn offer_id(&self) -> OfferId;

    /// Returns when this event occurred.
    fn timestamp(&self) -> Timestamp;

    /// Returns the type/category of this event.
    fn event_type(&self) -> EventType;

    /// Returns the human-readable name of this event.
    fn event_name(&self) -> &'static str;
}

/// Common metadata for all domain events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique identifier for this event.
    pub event_id: EventId,
    /// The offer this event relates to.
    pub offer_id: OfferId,
    /// When this event occurred.
    pub timestamp: Timestamp,
}

impl EventMetadata {
    /// Creates metadata for an offer with a generated event ID.
    #[must_use]
    pub fn for_offer(offer_id: OfferId, timestamp: Timestamp) -> Self {
        Self {
            event_id: EventId::new_v4(),
            offer_id,
            timestamp,
        }
    }
}
