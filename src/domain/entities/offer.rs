//! # Offer Aggregate
//!
//! A buyer's proposed price and terms for a property, tracked through a
//! bounded negotiation lifecycle.
//!
//! The [`Offer`] aggregate owns its state machine: every mutation goes through
//! a method that checks the [`OfferStatus`] transition, stamps the engine-owned
//! timestamps and bumps the optimistic-locking version.
//!
//! # State Machine
//!
//! ```text
//! Pending ──counter──→ Countered
//!   │                     │
//!   ├─accept──────────────┴─accept / accept_counter─→ Accepted
//!   ├─reject──────────────┴─reject─────────────────→ Rejected
//!   ├─withdraw────────────┴─withdraw───────────────→ Withdrawn
//!   └─expire──────────────┴─expire─────────────────→ Expired
//! ```
//!
//! # Examples
//!
//! ```
//! use offer_negotiation::domain::entities::offer::{Acceptance, OfferBuilder};
//! use offer_negotiation::domain::value_objects::{Amount, OfferStatus, PropertyId, Timestamp, UserId};
//!
//! let mut offer = OfferBuilder::new(
//!     PropertyId::new("prop-1"),
//!     UserId::new("buyer-1"),
//!     UserId::new("seller-1"),
//!     Amount::from_units(100).unwrap(),
//! )
//! .try_build()
//! .unwrap();
//!
//! offer.counter(Amount::from_units(120).unwrap(), None, Timestamp::now()).unwrap();
//! assert_eq!(offer.status(), OfferStatus::Countered);
//!
//! let price = offer.accept(Acceptance::Counter, None, Timestamp::now()).unwrap();
//! assert_eq!(price, Amount::from_units(120).unwrap());
//! assert_eq!(offer.amount(), price);
//! ```

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{
    Amount, OfferId, OfferStatus, PaymentTerms, PropertyId, Timestamp, TransactionId, UserId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of days an offer stays valid when the buyer gives no date.
pub const DEFAULT_VALIDITY_DAYS: i64 = 7;

/// Seller response stamped on offers rejected because a competitor won.
pub const SUPERSEDED_RESPONSE: &str = "Another offer was accepted";

/// How an offer is being accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acceptance {
    /// The seller accepts the buyer's amount.
    Direct,
    /// The buyer accepts the seller's counter amount.
    Counter,
}

/// Offer aggregate root.
///
/// # Invariants
///
/// - `buyer_id != seller_id`
/// - `amount > 0`, `counter_amount > 0` when present (enforced by [`Amount`])
/// - `counter_amount` is set at most once
/// - `transaction_id` is set exactly once, only on an accepted offer
/// - Status changes follow [`OfferStatus::can_transition_to`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    id: OfferId,
    property_id: PropertyId,
    buyer_id: UserId,
    seller_id: UserId,
    amount: Amount,
    payment_terms: PaymentTerms,
    message: Option<String>,
    status: OfferStatus,
    counter_amount: Option<Amount>,
    counter_message: Option<String>,
    seller_response: Option<String>,
    valid_until: Timestamp,
    transaction_id: Option<TransactionId>,
    created_at: Timestamp,
    updated_at: Timestamp,
    responded_at: Option<Timestamp>,
    accepted_at: Option<Timestamp>,
    version: u64,
}

/// Stored fields of an [`Offer`], used to rebuild the aggregate from storage.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct OfferParts {
    pub id: OfferId,
    pub property_id: PropertyId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub amount: Amount,
    pub payment_terms: PaymentTerms,
    pub message: Option<String>,
    pub status: OfferStatus,
    pub counter_amount: Option<Amount>,
    pub counter_message: Option<String>,
    pub seller_response: Option<String>,
    pub valid_until: Timestamp,
    pub transaction_id: Option<TransactionId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub responded_at: Option<Timestamp>,
    pub accepted_at: Option<Timestamp>,
    pub version: u64,
}

impl Offer {
    /// Rebuilds an offer from stored parts.
    ///
    /// Bypasses validation; only use with trusted storage.
    #[must_use]
    pub fn from_parts(parts: OfferParts) -> Self {
        Self {
            id: parts.id,
            property_id: parts.property_id,
            buyer_id: parts.buyer_id,
            seller_id: parts.seller_id,
            amount: parts.amount,
            payment_terms: parts.payment_terms,
            message: parts.message,
            status: parts.status,
            counter_amount: parts.counter_amount,
            counter_message: parts.counter_message,
            seller_response: parts.seller_response,
            valid_until: parts.valid_until,
            transaction_id: parts.transaction_id,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            responded_at: parts.responded_at,
            accepted_at: parts.accepted_at,
            version: parts.version,
        }
    }

    fn transition_to(&mut self, target: OfferStatus, now: Timestamp) -> DomainResult<()> {
        if !self.status.can_transition_to(target) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = now;
        self.version = self.version.saturating_add(1);
        Ok(())
    }

    // ========== Accessors ==========

    /// Returns the offer ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> OfferId {
        self.id
    }

    /// Returns the property this offer is for.
    #[inline]
    #[must_use]
    pub fn property_id(&self) -> &PropertyId {
        &self.property_id
    }

    /// Returns the buyer.
    #[inline]
    #[must_use]
    pub fn buyer_id(&self) -> &UserId {
        &self.buyer_id
    }

    /// Returns the seller (the property owner at submission time).
    #[inline]
    #[must_use]
    pub fn seller_id(&self) -> &UserId {
        &self.seller_id
    }

    /// Returns the offered amount.
    ///
    /// After a counter is accepted this is the counter amount.
    #[inline]
    #[must_use]
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Returns the payment terms.
    #[inline]
    #[must_use]
    pub fn payment_terms(&self) -> &PaymentTerms {
        &self.payment_terms
    }

    /// Returns the buyer's note, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> OfferStatus {
        self.status
    }

    /// Returns the seller's counter amount, if countered.
    #[inline]
    #[must_use]
    pub fn counter_amount(&self) -> Option<Amount> {
        self.counter_amount
    }

    /// Returns the seller's counter message, if any.
    #[must_use]
    pub fn counter_message(&self) -> Option<&str> {
        self.counter_message.as_deref()
    }

    /// Returns the seller's response text, if any.
    #[must_use]
    pub fn seller_response(&self) -> Option<&str> {
        self.seller_response.as_deref()
    }

    /// Returns when the offer lapses.
    #[inline]
    #[must_use]
    pub fn valid_until(&self) -> Timestamp {
        self.valid_until
    }

    /// Returns the transaction created on acceptance, if any.
    #[inline]
    #[must_use]
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    /// Returns when the offer was submitted.
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns when the offer was last modified.
    #[inline]
    #[must_use]
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns when the seller (or the buyer, for a counter) last responded.
    #[inline]
    #[must_use]
    pub fn responded_at(&self) -> Option<Timestamp> {
        self.responded_at
    }

    /// Returns when the offer was accepted.
    #[inline]
    #[must_use]
    pub fn accepted_at(&self) -> Option<Timestamp> {
        self.accepted_at
    }

    /// Returns the version for optimistic locking.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns true if the offer can still become accepted.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Returns true if the offer is still active but its validity has lapsed.
    #[must_use]
    pub fn is_lapsed_at(&self, now: &Timestamp) -> bool {
        self.is_active() && self.valid_until.is_expired_at(now)
    }

    /// Returns true if `user` is the buyer.
    #[must_use]
    pub fn is_buyer(&self, user: &UserId) -> bool {
        &self.buyer_id == user
    }

    /// Returns true if `user` is the seller.
    #[must_use]
    pub fn is_seller(&self, user: &UserId) -> bool {
        &self.seller_id == user
    }

    /// Returns true if `user` is the buyer or the seller.
    #[must_use]
    pub fn is_party(&self, user: &UserId) -> bool {
        self.is_buyer(user) || self.is_seller(user)
    }

    // ========== State Transitions ==========

    /// Records the seller's single counter-proposal.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless the offer is
    /// `Pending`; a countered offer cannot be countered again.
    pub fn counter(
        &mut self,
        counter_amount: Amount,
        message: Option<String>,
        now: Timestamp,
    ) -> DomainResult<()> {
        if self.status != OfferStatus::Pending || self.counter_amount.is_some() {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: OfferStatus::Countered,
            });
        }
        self.transition_to(OfferStatus::Countered, now)?;
        self.counter_amount = Some(counter_amount);
        self.counter_message = message;
        self.responded_at = Some(now);
        Ok(())
    }

    /// Accepts the offer and returns the final agreed price.
    ///
    /// A direct acceptance keeps the buyer's amount. Accepting a counter
    /// requires a `Countered` offer and overwrites the amount with the
    /// counter amount.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if the offer is not in a
    /// state the acceptance kind allows.
    pub fn accept(
        &mut self,
        acceptance: Acceptance,
        response: Option<String>,
        now: Timestamp,
    ) -> DomainResult<Amount> {
        let final_price = match acceptance {
            Acceptance::Direct => self.amount,
            Acceptance::Counter => match (self.status, self.counter_amount) {
                (OfferStatus::Countered, Some(counter)) => counter,
                _ => {
                    return Err(DomainError::InvalidStateTransition {
                        from: self.status,
                        to: OfferStatus::Accepted,
                    });
                }
            },
        };

        self.transition_to(OfferStatus::Accepted, now)?;
        self.amount = final_price;
        self.accepted_at = Some(now);
        self.responded_at = Some(now);
        if response.is_some() {
            self.seller_response = response;
        }
        Ok(final_price)
    }

    /// Rejects the offer with an optional seller response.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if the offer is terminal.
    pub fn reject(&mut self, response: Option<String>, now: Timestamp) -> DomainResult<()> {
        self.transition_to(OfferStatus::Rejected, now)?;
        self.seller_response = response;
        self.responded_at = Some(now);
        Ok(())
    }

    /// Rejects the offer because a competing offer on the property was accepted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if the offer is terminal.
    pub fn reject_superseded(&mut self, now: Timestamp) -> DomainResult<()> {
        self.reject(Some(SUPERSEDED_RESPONSE.to_string()), now)
    }

    /// Withdraws the offer on the buyer's behalf.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if the offer is terminal.
    pub fn withdraw(&mut self, now: Timestamp) -> DomainResult<()> {
        self.transition_to(OfferStatus::Withdrawn, now)
    }

    /// Marks the offer as lapsed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if the offer is terminal.
    pub fn expire(&mut self, now: Timestamp) -> DomainResult<()> {
        self.transition_to(OfferStatus::Expired, now)
    }

    /// Links the transaction created for this accepted offer.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if the offer is not
    /// accepted or already carries a transaction.
    pub fn link_transaction(&mut self, transaction_id: TransactionId) -> DomainResult<()> {
        if self.status != OfferStatus::Accepted || self.transaction_id.is_some() {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: OfferStatus::Accepted,
            });
        }
        self.transaction_id = Some(transaction_id);
        Ok(())
    }
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Offer[{}] property={} buyer={} amount={} status={}",
            self.id, self.property_id, self.buyer_id, self.amount, self.status
        )
    }
}

/// Builder for submitting a new [`Offer`].
///
/// # Examples
///
/// ```
/// use offer_negotiation::domain::entities::offer::OfferBuilder;
/// use offer_negotiation::domain::value_objects::{Amount, PaymentTerms, PropertyId, UserId};
///
/// let offer = OfferBuilder::new(
///     PropertyId::new("prop-1"),
///     UserId::new("buyer-1"),
///     UserId::new("seller-1"),
///     Amount::from_units(250_000).unwrap(),
/// )
/// .payment_terms(PaymentTerms::Cash)
/// .message("Flexible on closing date")
/// .try_build()
/// .unwrap();
///
/// assert!(offer.is_active());
/// ```
#[must_use = "builders do nothing unless .try_build() is called"]
pub struct OfferBuilder {
    property_id: PropertyId,
    buyer_id: UserId,
    seller_id: UserId,
    amount: Amount,
    payment_terms: PaymentTerms,
    message: Option<String>,
    valid_until: Option<Timestamp>,
    validity_days: i64,
    now: Option<Timestamp>,
}

impl OfferBuilder {
    /// Creates a new builder with required fields.
    pub fn new(
        property_id: PropertyId,
        buyer_id: UserId,
        seller_id: UserId,
        amount: Amount,
    ) -> Self {
        Self {
            property_id,
            buyer_id,
            seller_id,
            amount,
            payment_terms: PaymentTerms::Cash,
            message: None,
            valid_until: None,
            validity_days: DEFAULT_VALIDITY_DAYS,
            now: None,
        }
    }

    /// Sets the payment terms.
    pub fn payment_terms(mut self, terms: PaymentTerms) -> Self {
        self.payment_terms = terms;
        self
    }

    /// Sets the buyer's note.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets an explicit expiry instead of the default validity window.
    pub fn valid_until(mut self, valid_until: Option<Timestamp>) -> Self {
        self.valid_until = valid_until;
        self
    }

    /// Sets the default validity window used when no expiry is given.
    pub fn validity_days(mut self, days: i64) -> Self {
        self.validity_days = days;
        self
    }

    /// Sets the submission instant (defaults to now).
    pub fn created_at(mut self, now: Timestamp) -> Self {
        self.now = Some(now);
        self
    }

    /// Validates and builds a `Pending` offer.
    ///
    /// # Errors
    ///
    /// - `DomainError::SelfDealing` if buyer and seller are the same user
    /// - `DomainError::InvalidTerms` if the terms are malformed or the
    ///   expiry is not in the future
    pub fn try_build(self) -> DomainResult<Offer> {
        if self.buyer_id == self.seller_id {
            return Err(DomainError::SelfDealing);
        }
        self.payment_terms.validate()?;

        let now = self.now.unwrap_or_else(Timestamp::now);
        let valid_until = match self.valid_until {
            Some(valid_until) => {
                if !valid_until.is_after(&now) {
                    return Err(DomainError::invalid_terms(
                        "valid_until must be in the future",
                    ));
                }
                valid_until
            }
            None => now.add_days(self.validity_days),
        };

        Ok(Offer {
            id: OfferId::new_v4(),
            property_id: self.property_id,
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            amount: self.amount,
            payment_terms: self.payment_terms,
            message: self.message,
            status: OfferStatus::Pending,
            counter_amount: None,
            counter_message: None,
            seller_response: None,
            valid_until,
            transaction_id: None,
            created_at: now,
            updated_at: now,
            responded_at: None,
            accepted_at: None,
            version: 1,
        })
    }
}
