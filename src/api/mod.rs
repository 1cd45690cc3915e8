//! # API Layer
//!
//! External interfaces of the negotiation engine.

pub mod rest;
