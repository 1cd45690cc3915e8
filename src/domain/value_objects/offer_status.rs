//! # Offer Status
//!
//! Offer lifecycle state machine.
//!
//! This module provides the [`OfferStatus`] enum representing the lifecycle
//! of a buyer's offer on a property, from submission until it is accepted,
//! rejected, withdrawn or expired.
//!
//! # State Machine
//!
//! ```text
//! Pending ──→ Countered
//!   │            │
//!   ├────────────┴→ Accepted
//!   ├────────────┴→ Rejected
//!   ├────────────┴→ Withdrawn
//!   └────────────┴→ Expired
//! ```
//!
//! A countered offer can never be countered again.
//!
//! # Examples
//!
//! ```
//! use offer_negotiation::domain::value_objects::offer_status::OfferStatus;
//!
//! let status = OfferStatus::Pending;
//! assert!(status.can_transition_to(OfferStatus::Countered));
//! assert!(!OfferStatus::Countered.can_transition_to(OfferStatus::Countered));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Offer lifecycle status.
///
/// State transitions are enforced via
/// [`can_transition_to`](OfferStatus::can_transition_to).
///
/// # Terminal States
///
/// - [`Accepted`](OfferStatus::Accepted): the offer became a transaction
/// - [`Rejected`](OfferStatus::Rejected): the seller declined, or a competing
///   offer was accepted
/// - [`Withdrawn`](OfferStatus::Withdrawn): the buyer pulled the offer
/// - [`Expired`](OfferStatus::Expired): `valid_until` passed while active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OfferStatus {
    /// Submitted by the buyer, awaiting the seller.
    #[default]
    Pending = 0,

    /// The seller proposed a counter amount, awaiting the buyer.
    Countered = 1,

    /// The offer was accepted and a transaction created (terminal).
    Accepted = 2,

    /// The offer was rejected (terminal).
    Rejected = 3,

    /// The buyer withdrew the offer (terminal).
    Withdrawn = 4,

    /// The offer lapsed past its validity window (terminal).
    Expired = 5,
}

impl OfferStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Countered,
        Self::Accepted,
        Self::Rejected,
        Self::Withdrawn,
        Self::Expired,
    ];

    /// Statuses in which an offer can still become accepted.
    pub const ACTIVE: [Self; 2] = [Self::Pending, Self::Countered];

    /// Returns true if this is a terminal state.
    ///
    /// # Examples
    ///
    /// ```
    /// use offer_negotiation::domain::value_objects::offer_status::OfferStatus;
    ///
    /// assert!(!OfferStatus::Pending.is_terminal());
    /// assert!(OfferStatus::Accepted.is_terminal());
    /// assert!(OfferStatus::Withdrawn.is_terminal());
    /// ```
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if the offer can still transition to accepted.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Countered)
    }

    /// Returns true if this state can transition to the target state.
    ///
    /// - Pending → Countered, Accepted, Rejected, Withdrawn, Expired
    /// - Countered → Accepted, Rejected, Withdrawn, Expired
    /// - Terminal states → (none)
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Countered)
                | (Self::Pending, Self::Accepted)
                | (Self::Pending, Self::Rejected)
                | (Self::Pending, Self::Withdrawn)
                | (Self::Pending, Self::Expired)
                | (Self::Countered, Self::Accepted)
                | (Self::Countered, Self::Rejected)
                | (Self::Countered, Self::Withdrawn)
                | (Self::Countered, Self::Expired)
        )
    }

    /// Returns the valid next states from this state.
    #[must_use]
    pub fn valid_transitions(&self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|target| self.can_transition_to(*target))
            .collect()
    }

    /// Returns the lowercase name used in storage and on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Countered => "countered",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
            Self::Expired => "expired",
        }
    }

    /// Returns the numeric value of this state.
    #[inline]
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Countered => "COUNTERED",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Withdrawn => "WITHDRAWN",
            Self::Expired => "EXPIRED",
        };
        write!(f, "{s}")
    }
}

/// Error returned when parsing an unknown offer status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOfferStatusError(
    /// The unrecognized value.
    pub String,
);

impl fmt::Display for InvalidOfferStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid offer status: {}", self.0)
    }
}

impl std::error::Error for InvalidOfferStatusError {}

impl FromStr for OfferStatus {
    type Err = InvalidOfferStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| InvalidOfferStatusError(s.to_string()))
    }
}

impl TryFrom<u8> for OfferStatus {
    type Error = InvalidOfferStatusError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_u8() == value)
            .ok_or_else(|| InvalidOfferStatusError(value.to_string()))
    }
}
