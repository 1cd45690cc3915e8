//! # Identity Adapters
//!
//! - [`JwtIdentityProvider`]: HS256 bearer tokens whose `sub` claim is the
//!   user id

pub mod jwt;

pub use jwt::{Claims, JwtIdentityProvider};
