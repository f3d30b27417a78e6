//! Duet — HTTP API.
//!
//! Exposes the session operations over axum. The binary in `main.rs` wires
//! configuration, telemetry, Postgres and the Gemini narrators into
//! [`state::AppState`] and serves [`app`].

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the full router with every route nested under its prefix.
pub fn app(state: state::AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/sessions", routes::session::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
