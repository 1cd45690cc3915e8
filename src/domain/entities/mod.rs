//! # Domain Entities
//!
//! Aggregate roots and entities representing core business concepts.
//!
//! ## Aggregates
//!
//! - [`Offer`]: a buyer's offer with its negotiation state machine
//!
//! ## Entities
//!
//! - [`Transaction`]: the deal created when an offer is accepted

pub mod offer;
pub mod transaction;

pub use offer::{
    Acceptance, DEFAULT_VALIDITY_DAYS, Offer, OfferBuilder, OfferParts, SUPERSEDED_RESPONSE,
};
pub use transaction::{Transaction, TransactionStatus};
