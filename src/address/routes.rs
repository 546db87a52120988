// src/address/routes.rs

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers;

pub fn address_routes() -> Router {
    Router::new()
        // Session lifecycle
        .route("/api/address/sessions", post(handlers::create_session))
        .route(
            "/api/address/sessions/:id",
            get(handlers::get_session).delete(handlers::close_session),
        )
        // Prefill from a persisted record (one-shot per section)
        .route(
            "/api/address/sessions/:id/prefill",
            post(handlers::prefill_session),
        )
        // Tier selection (cascading resolution)
        .route(
            "/api/address/sessions/:id/select",
            put(handlers::select_tier),
        )
        // Free-text fields and the same-as-present flag
        .route("/api/address/sessions/:id/fields", put(handlers::set_fields))
        // Validate and forward to the profile API
        .route(
            "/api/address/sessions/:id/submit",
            post(handlers::submit_session),
        )
}
