//! # In-Memory Repositories
//!
//! In-memory implementations for tests and single-process deployments.
//!
//! ## Thread Safety
//!
//! [`InMemoryNegotiationStore`] keeps all offers and transactions behind one
//! `Arc<RwLock<..>>`; every atomic unit runs under a single write guard.

pub mod negotiation_store;

pub use negotiation_store::InMemoryNegotiationStore;
