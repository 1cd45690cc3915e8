//! # REST Routes
//!
//! Router construction for the negotiation API.

use crate::api::rest::handlers::{self, AppState};
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Creates the API router with request tracing.
pub fn create_router(state: Arc<AppState>) -> Router {
    let offers = Router::new()
        .route("/", post(handlers::submit_offer).get(handlers::list_offers))
        .route("/{id}", get(handlers::get_offer))
        .route("/{id}/accept", post(handlers::accept_offer))
        .route("/{id}/accept-counter", post(handlers::accept_counter_offer))
        .route("/{id}/reject", post(handlers::reject_offer))
        .route("/{id}/counter", post(handlers::counter_offer))
        .route("/{id}/withdraw", post(handlers::withdraw_offer))
        .route("/{id}/transaction", get(handlers::get_transaction));

    let properties = Router::new()
        .route("/{id}/offers", get(handlers::list_property_offers))
        .route("/{id}/offers/active", get(handlers::has_active_offer));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .nest("/offers", offers)
        .nest("/properties", properties);

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
