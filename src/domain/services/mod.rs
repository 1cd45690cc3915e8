//! # Domain Services
//!
//! Domain services encapsulating business logic that spans more than one
//! aggregate.
//!
//! ## Services
//!
//! - [`acceptance::settle_acceptance`]: accept one offer, supersede its
//!   competitors and initiate the transaction

pub mod acceptance;

pub use acceptance::{AcceptanceOutcome, settle_acceptance};
