//! # Listing Lookup Adapters
//!
//! Implementations of [`ListingLookup`](crate::application::ports::ListingLookup).
//!
//! - [`InMemoryListingLookup`]: concurrent map, for tests and local runs
//! - [`HttpListingLookup`]: the listing service over HTTP

pub mod http;
pub mod in_memory;

pub use http::HttpListingLookup;
pub use in_memory::InMemoryListingLookup;
