//! # Persistence Layer
//!
//! Offer Store and Transaction Store ports and their implementations.
//!
//! ## Repository Traits (Ports)
//!
//! - [`OfferRepository`]: Offers, including the atomic acceptance unit
//! - [`TransactionRepository`]: Transactions created by acceptance
//!
//! ## Implementations
//!
//! - `in_memory`: Single-process store for tests and local runs
//! - `postgres`: PostgreSQL store backed by sqlx

pub mod in_memory;
pub mod postgres;
pub mod traits;

pub use traits::{
    AcceptanceRequest, OfferRepository, RepositoryError, RepositoryResult, TransactionRepository,
};
