//! # Offer Events
//!
//! Domain events for the offer negotiation lifecycle.
//!
//! # Event Flow
//!
//! ```text
//! OfferSubmitted -> OfferCountered? -> OfferAccepted + TransactionCreated
//!                                        (+ OfferRejected for each competitor)
//!                                   -> OfferRejected | OfferWithdrawn | OfferExpired
//! ```

use crate::domain::entities::{Offer, Transaction};
use crate::domain::events::domain_event::{DomainEvent, EventMetadata, EventType};
use crate::domain::value_objects::timestamp::Timestamp;
use crate::domain::value_objects::{
    Amount, EventId, OfferId, PropertyId, TransactionId, UserId,
};
use serde::{Deserialize, Serialize};

macro_rules! impl_domain_event {
    ($event:ty, $event_type:expr, $name:literal) => {
        impl DomainEvent for $event {
            fn event_id(&self) -> EventId {
                self.metadata.event_id
            }

            fn offer_id(&self) -> OfferId {
                self.metadata.offer_id
            }

            fn timestamp(&self) -> Timestamp {
                self.metadata.timestamp
            }

            fn event_type(&self) -> EventType {
                $event_type
            }

            fn event_name(&self) -> &'static str {
                $name
            }
        }
    };
}

/// Event emitted when a buyer submits an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferSubmitted {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// The property.
    pub property_id: PropertyId,
    /// The buyer.
    pub buyer_id: UserId,
    /// The seller.
    pub seller_id: UserId,
    /// The offered amount.
    pub amount: Amount,
}

impl OfferSubmitted {
    /// Creates the event from a freshly submitted offer.
    #[must_use]
    pub fn new(offer: &Offer) -> Self {
        Self {
            metadata: EventMetadata::for_offer(offer.id(), offer.created_at()),
            property_id: offer.property_id().clone(),
            buyer_id: offer.buyer_id().clone(),
            seller_id: offer.seller_id().clone(),
            amount: offer.amount(),
        }
    }
}

impl_domain_event!(OfferSubmitted, EventType::Offer, "OfferSubmitted");

/// Event emitted when the seller counters an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferCountered {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// The property.
    pub property_id: PropertyId,
    /// The buyer's original amount.
    pub original_amount: Amount,
    /// The seller's counter amount.
    pub counter_amount: Amount,
}

impl OfferCountered {
    /// Creates the event from a countered offer.
    #[must_use]
    pub fn new(offer: &Offer, counter_amount: Amount, timestamp: Timestamp) -> Self {
        Self {
            metadata: EventMetadata::for_offer(offer.id(), timestamp),
            property_id: offer.property_id().clone(),
            original_amount: offer.amount(),
            counter_amount,
        }
    }
}

impl_domain_event!(OfferCountered, EventType::Offer, "OfferCountered");

/// Event emitted when an offer is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferAccepted {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// The property.
    pub property_id: PropertyId,
    /// The final agreed price.
    pub final_price: Amount,
    /// The transaction created for the offer.
    pub transaction_id: TransactionId,
    /// Offers on the same property rejected in the same step.
    pub superseded: Vec<OfferId>,
}

impl OfferAccepted {
    /// Creates the event for an accepted offer.
    #[must_use]
    pub fn new(
        offer: &Offer,
        transaction_id: TransactionId,
        superseded: Vec<OfferId>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            metadata: EventMetadata::for_offer(offer.id(), timestamp),
            property_id: offer.property_id().clone(),
            final_price: offer.amount(),
            transaction_id,
            superseded,
        }
    }
}

impl_domain_event!(OfferAccepted, EventType::Offer, "OfferAccepted");

/// Why an offer was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    /// The seller rejected it.
    SellerDecision,
    /// A competing offer on the property was accepted.
    Superseded,
}

/// Event emitted when an offer is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRejected {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// The property.
    pub property_id: PropertyId,
    /// The buyer.
    pub buyer_id: UserId,
    /// Why the offer was rejected.
    pub reason: RejectionReason,
}

impl OfferRejected {
    /// Creates the event for a rejected offer.
    #[must_use]
    pub fn new(offer: &Offer, reason: RejectionReason, timestamp: Timestamp) -> Self {
        Self {
            metadata: EventMetadata::for_offer(offer.id(), timestamp),
            property_id: offer.property_id().clone(),
            buyer_id: offer.buyer_id().clone(),
            reason,
        }
    }
}

impl_domain_event!(OfferRejected, EventType::Offer, "OfferRejected");

/// Event emitted when the buyer withdraws an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferWithdrawn {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// The property.
    pub property_id: PropertyId,
}

impl OfferWithdrawn {
    /// Creates the event for a withdrawn offer.
    #[must_use]
    pub fn new(offer: &Offer, timestamp: Timestamp) -> Self {
        Self {
            metadata: EventMetadata::for_offer(offer.id(), timestamp),
            property_id: offer.property_id().clone(),
        }
    }
}

impl_domain_event!(OfferWithdrawn, EventType::Offer, "OfferWithdrawn");

/// Event emitted when an active offer lapses past its validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferExpired {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// The property.
    pub property_id: PropertyId,
    /// The validity deadline that passed.
    pub valid_until: Timestamp,
}

impl OfferExpired {
    /// Creates the event for an expired offer.
    #[must_use]
    pub fn new(offer: &Offer, timestamp: Timestamp) -> Self {
        Self {
            metadata: EventMetadata::for_offer(offer.id(), timestamp),
            property_id: offer.property_id().clone(),
            valid_until: offer.valid_until(),
        }
    }
}

impl_domain_event!(OfferExpired, EventType::Offer, "OfferExpired");

/// Event emitted when acceptance creates a transaction.
///
/// Downstream deal management subscribes to this event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCreated {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// The new transaction.
    pub transaction_id: TransactionId,
    /// The property.
    pub property_id: PropertyId,
    /// The buyer.
    pub buyer_id: UserId,
    /// The seller.
    pub seller_id: UserId,
    /// The agreed price.
    pub agreed_price: Amount,
}

impl TransactionCreated {
    /// Creates the event for a new transaction.
    #[must_use]
    pub fn new(transaction: &Transaction) -> Self {
        Self {
            metadata: EventMetadata::for_offer(transaction.offer_id(), transaction.created_at()),
            transaction_id: transaction.id(),
            property_id: transaction.property_id().clone(),
            buyer_id: transaction.buyer_id().clone(),
            seller_id: transaction.seller_id().clone(),
            agreed_price: transaction.agreed_price(),
        }
    }
}

impl_domain_event!(TransactionCreated, EventType::Transaction, "TransactionCreated");

/// Enum containing all negotiation events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OfferEvent {
    /// Offer submitted.
    Submitted(OfferSubmitted),
    /// Offer countered.
    Countered(OfferCountered),
    /// Offer accepted.
    Accepted(OfferAccepted),
    /// Offer rejected.
    Rejected(OfferRejected),
    /// Offer withdrawn.
    Withdrawn(OfferWithdrawn),
    /// Offer expired.
    Expired(OfferExpired),
    /// Transaction created.
    TransactionCreated(TransactionCreated),
}

impl OfferEvent {
    fn inner(&self) -> &dyn DomainEvent {
        match self {
            Self::Submitted(e) => e,
            Self::Countered(e) => e,
            Self::Accepted(e) => e,
            Self::Rejected(e) => e,
            Self::Withdrawn(e) => e,
            Self::Expired(e) => e,
            Self::TransactionCreated(e) => e,
        }
    }
}

impl DomainEvent for OfferEvent {
    fn event_id(&self) -> EventId {
        self.inner().event_id()
    }

    fn offer_id(&self) -> OfferId {
        self.inner().offer_id()
    }

    fn timestamp(&self) -> Timestamp {
        self.inner().timestamp()
    }

    fn event_type(&self) -> EventType {
        self.inner().event_type()
    }

    fn event_name(&self) -> &'static str {
        self.inner().event_name()
    }
}
