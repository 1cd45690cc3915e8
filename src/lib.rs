//! # Offer Negotiation
//!
//! A negotiation engine for property offers: buyers submit offers, sellers
//! counter, accept or reject them, and an accepted offer atomically rejects
//! its competitors and creates a transaction.
//!
//! # Architecture
//!
//! ```text
//! api (axum REST)
//!   -> application (NegotiationEngine, ports, error taxonomy)
//!     -> domain (Offer state machine, Transaction, events)
//!   -> infrastructure (stores, listing lookup, identity, notifier, events)
//! ```
//!
//! # Guarantees
//!
//! - A buyer holds at most one active offer per property
//! - At most one offer per property is ever accepted, and every accepted
//!   offer is linked to exactly one transaction at the agreed price
//! - A seller never bids on their own property
//! - Terminal offers never change
//!
//! # Example
//!
//! ```ignore
//! use offer_negotiation::prelude::*;
//!
//! let offer = engine
//!     .submit_offer(&Caller::user("buyer-1"), SubmitOffer::new("prop-1", 250_000.into()))
//!     .await?;
//! let accepted = engine.accept_offer(&Caller::user("seller-1"), offer.id(), None).await?;
//! assert_eq!(accepted.offer.transaction_id(), Some(accepted.transaction.id()));
//! ```

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

/// Commonly used types.
pub mod prelude {
    pub use crate::application::error::{ErrorKind, NegotiationError, NegotiationResult};
    pub use crate::application::ports::{Caller, PropertySummary};
    pub use crate::application::services::{
        AcceptedOffer, ActorRole, EngineConfig, NegotiationEngine, OutboundDispatcher, SubmitOffer,
    };
    pub use crate::domain::entities::{Offer, Transaction};
    pub use crate::domain::value_objects::{
        Amount, OfferId, OfferStatus, PaymentTerms, PropertyId, UserId,
    };
}
