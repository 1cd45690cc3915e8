//! # Infrastructure Layer
//!
//! Adapters for the ports the application layer consumes.
//!
//! - [`persistence`]: offer and transaction stores (in-memory, Postgres)
//! - [`listings`]: property lookup (in-memory, HTTP)
//! - [`identity`]: bearer token verification
//! - [`notifications`]: user notifications (log, webhook, recording)
//! - [`events`]: domain event publishing (tracing, recording, NATS)

pub mod events;
pub mod http_client;
pub mod identity;
pub mod listings;
pub mod notifications;
pub mod persistence;
