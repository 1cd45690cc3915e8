//! # Domain Layer
//!
//! Entities, value objects, events and domain services of the offer
//! negotiation engine. Nothing in this layer performs I/O.

pub mod entities;
pub mod errors;
pub mod events;
pub mod services;
pub mod value_objects;

pub use errors::{DomainError, DomainResult};
