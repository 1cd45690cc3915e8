//! # PostgreSQL Repositories
//!
//! sqlx-backed implementations of the persistence ports. The schema lives
//! in `migrations/` at the crate root.

pub mod negotiation_store;

pub use negotiation_store::PostgresNegotiationStore;
