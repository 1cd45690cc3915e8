//! # Application Services
//!
//! Services that orchestrate domain logic and infrastructure.
//!
//! - [`NegotiationEngine`]: the offer lifecycle operations and queries
//! - [`OutboundDispatcher`]: post-commit notifications and domain events

pub mod negotiation_engine;
pub mod outbound;

pub use negotiation_engine::{
    AcceptedOffer, ActorRole, EngineConfig, NegotiationEngine, SubmitOffer,
};
pub use outbound::{Outbound, OutboundDispatcher};
