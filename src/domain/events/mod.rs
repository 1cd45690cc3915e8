//! # Domain Events
//!
//! Events emitted after negotiation state changes commit.
//!
//! ## Offer Events
//!
//! - [`OfferSubmitted`]: New offer created
//! - [`OfferCountered`]: Seller proposed a counter amount
//! - [`OfferAccepted`]: Offer accepted, competitors rejected
//! - [`OfferRejected`]: Offer rejected by the seller or superseded
//! - [`OfferWithdrawn`]: Buyer withdrew the offer
//! - [`OfferExpired`]: Offer lapsed past its validity
//!
//! ## Transaction Events
//!
//! - [`TransactionCreated`]: Deal record created by acceptance

pub mod domain_event;
pub mod offer_events;

pub use domain_event::{DomainEvent, EventMetadata, EventType};
pub use offer_events::{
    OfferAccepted, OfferCountered, OfferEvent, OfferExpired, OfferRejected, OfferSubmitted,
    OfferWithdrawn, RejectionReason, TransactionCreated,
};
