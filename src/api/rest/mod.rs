//! # REST API
//!
//! REST endpoints over the negotiation engine using axum.
//!
//! Callers authenticate with `Authorization: Bearer <jwt>`. Every response
//! uses the `{ success, data?, error? }` envelope.
//!
//! # Endpoints
//!
//! ## Offers
//! - `POST /api/v1/offers` - Submit an offer
//! - `GET /api/v1/offers?role=buyer|seller` - Offers made or received
//! - `GET /api/v1/offers/{id}` - Get an offer
//! - `POST /api/v1/offers/{id}/accept` - Accept (seller)
//! - `POST /api/v1/offers/{id}/accept-counter` - Accept the counter (buyer)
//! - `POST /api/v1/offers/{id}/reject` - Reject (seller)
//! - `POST /api/v1/offers/{id}/counter` - Counter (seller)
//! - `POST /api/v1/offers/{id}/withdraw` - Withdraw (buyer)
//! - `GET /api/v1/offers/{id}/transaction` - Transaction of an accepted offer
//!
//! ## Properties
//! - `GET /api/v1/properties/{id}/offers` - Offers on an owned property
//! - `GET /api/v1/properties/{id}/offers/active` - Whether the caller holds
//!   an active offer
//!
//! ## Health
//! - `GET /api/v1/health` - Health check endpoint
//!
//! # Usage
//!
//! ```ignore
//! use offer_negotiation::api::rest::{create_router, AppState};
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::new(engine, identity));
//! let router = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    AcceptanceResponse, ActiveOfferResponse, ApiError, ApiResponse, AppState, CallerIdentity,
    CounterRequest, ErrorBody, HealthResponse, OfferResponse, RespondRequest, TransactionResponse,
    status_for,
};
pub use routes::create_router;
