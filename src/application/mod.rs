//! # Application Layer
//!
//! Use cases of the negotiation engine, the ports it consumes and the
//! error taxonomy it exposes to callers.

pub mod error;
pub mod ports;
pub mod services;

pub use error::{ErrorKind, InfrastructureError, NegotiationError, NegotiationResult};
pub use ports::{
    Caller, EventPublisher, IdentityProvider, ListingLookup, Notification, NotificationKind,
    Notifier, PropertySummary,
};
pub use services::{
    AcceptedOffer, ActorRole, EngineConfig, NegotiationEngine, OutboundDispatcher, SubmitOffer,
};
