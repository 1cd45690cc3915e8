//! # Collaborator Ports
//!
//! Async traits for the external collaborators the engine consumes:
//!
//! - [`ListingLookup`]: property owner and availability
//! - [`IdentityProvider`]: resolves a bearer token into a [`Caller`]
//! - [`Notifier`]: fire-and-forget user notifications
//! - [`EventPublisher`]: outbound domain events
//!
//! Implementations live under `infrastructure`. Notifier and publisher
//! failures are logged by the engine and never roll back a committed change.

use crate::application::error::{NegotiationError, NegotiationResult};
use crate::domain::events::OfferEvent;
use crate::domain::value_objects::{Amount, OfferId, PropertyId, TransactionId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ========== Identity ==========

/// The resolved identity of whoever invoked an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Caller {
    /// No valid credentials were presented.
    #[default]
    Anonymous,
    /// An authenticated user.
    User(UserId),
}

impl Caller {
    /// Creates an authenticated caller.
    #[must_use]
    pub fn user(id: impl Into<UserId>) -> Self {
        Self::User(id.into())
    }

    /// Returns the user id if authenticated.
    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(id),
        }
    }

    /// Returns the user id or fails with `NotAuthenticated`.
    ///
    /// # Errors
    ///
    /// Returns `NegotiationError::NotAuthenticated` for anonymous callers.
    pub fn require_user(&self) -> NegotiationResult<&UserId> {
        self.user_id().ok_or(NegotiationError::NotAuthenticated)
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::User(id) => write!(f, "{id}"),
        }
    }
}

/// Error resolving caller credentials.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The token is malformed or its signature does not verify.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The token has expired.
    #[error("token expired")]
    Expired,
}

/// Resolves bearer credentials into a [`Caller`].
#[async_trait]
pub trait IdentityProvider: Send + Sync + fmt::Debug {
    /// Resolves `token` into a caller.
    ///
    /// A missing token resolves to [`Caller::Anonymous`].
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if a token is present but cannot be trusted.
    async fn resolve(&self, token: Option<&str>) -> Result<Caller, IdentityError>;
}

// ========== Listings ==========

/// What the engine needs to know about a listed property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySummary {
    /// The property.
    pub property_id: PropertyId,
    /// Current owner; becomes the seller of new offers.
    pub owner_id: UserId,
    /// Whether the listing accepts offers.
    pub is_available: bool,
}

impl PropertySummary {
    /// Creates a summary for an available property.
    #[must_use]
    pub fn available(property_id: impl Into<PropertyId>, owner_id: impl Into<UserId>) -> Self {
        Self {
            property_id: property_id.into(),
            owner_id: owner_id.into(),
            is_available: true,
        }
    }

    /// Marks the property as unavailable.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.is_available = false;
        self
    }
}

/// Error looking up a listing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// Could not reach the listing service.
    #[error("listing lookup connection error: {0}")]
    Connection(String),

    /// The listing service answered with something unusable.
    #[error("listing lookup protocol error: {0}")]
    Protocol(String),
}

/// Read access to listed properties.
#[async_trait]
pub trait ListingLookup: Send + Sync + fmt::Debug {
    /// Returns the property summary, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `LookupError` on infrastructure failures only.
    async fn get_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Option<PropertySummary>, LookupError>;
}

// ========== Notifications ==========

/// What happened, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A buyer submitted an offer to the seller.
    OfferReceived,
    /// The seller countered the buyer's offer.
    OfferCountered,
    /// The counterparty accepted.
    OfferAccepted,
    /// The seller rejected, or another offer won.
    OfferRejected,
    /// The buyer withdrew.
    OfferWithdrawn,
}

impl NotificationKind {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OfferReceived => "offer_received",
            Self::OfferCountered => "offer_countered",
            Self::OfferAccepted => "offer_accepted",
            Self::OfferRejected => "offer_rejected",
            Self::OfferWithdrawn => "offer_withdrawn",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Who receives it.
    pub recipient: UserId,
    /// What happened.
    pub kind: NotificationKind,
    /// The offer concerned.
    pub offer_id: OfferId,
    /// The property concerned.
    pub property_id: PropertyId,
    /// Offer, counter or agreed amount, depending on `kind`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    /// Transaction created by an acceptance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    /// Free text from the other party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Notification {
    /// Creates a notification with no optional payload.
    #[must_use]
    pub fn new(
        recipient: UserId,
        kind: NotificationKind,
        offer_id: OfferId,
        property_id: PropertyId,
    ) -> Self {
        Self {
            recipient,
            kind,
            offer_id,
            property_id,
            amount: None,
            transaction_id: None,
            message: None,
        }
    }

    /// Sets the amount.
    #[must_use]
    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Sets the transaction id.
    #[must_use]
    pub fn with_transaction(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }
}

/// Error delivering a notification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifierError {
    /// Transport failure.
    #[error("notification delivery failed: {0}")]
    Delivery(String),

    /// The receiving endpoint refused the notification.
    #[error("notification rejected with status {status}")]
    Rejected {
        /// HTTP-like status code.
        status: u16,
    },
}

/// Delivers notifications to users.
#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Delivers one notification.
    ///
    /// # Errors
    ///
    /// Returns `NotifierError` if delivery fails.
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError>;
}

// ========== Events ==========

/// Error publishing a domain event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    /// The event could not be encoded.
    #[error("event serialization failed: {0}")]
    Serialization(String),

    /// The broker could not be reached.
    #[error("event transport failed: {0}")]
    Transport(String),
}

/// Publishes domain events after their state change commits.
#[async_trait]
pub trait EventPublisher: Send + Sync + fmt::Debug {
    /// Publishes one event.
    ///
    /// # Errors
    ///
    /// Returns `PublishError` if the event cannot be delivered.
    async fn publish(&self, event: &OfferEvent) -> Result<(), PublishError>;
}
