//! # Value Objects
//!
//! Immutable types with validation and domain semantics.
//!
//! ## Identity Types
//!
//! - [`OfferId`], [`TransactionId`], [`EventId`]: UUID-based identifiers
//! - [`UserId`], [`PropertyId`]: identifiers owned by external services
//!
//! ## Money
//!
//! - [`Amount`]: strictly positive decimal amount
//! - [`PaymentTerms`]: cash / financed / mixed, with financing details
//!
//! ## Lifecycle
//!
//! - [`OfferStatus`]: offer state machine
//! - [`Timestamp`]: UTC instant

pub mod amount;
pub mod ids;
pub mod offer_status;
pub mod payment_terms;
pub mod timestamp;

pub use amount::Amount;
pub use ids::{EventId, OfferId, PropertyId, TransactionId, UserId};
pub use offer_status::{InvalidOfferStatusError, OfferStatus};
pub use payment_terms::{FinancingDetails, FinancingStatus, PaymentTerms};
pub use timestamp::Timestamp;
