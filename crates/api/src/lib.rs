//! HTTP façade over the content document store.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// The router with every route group and the request middleware stack.
pub fn build_app(state: AppState) -> Router {
    let max_body_bytes = state.config().max_body_bytes;
    // Applied innermost-first (body limit, then tracing, then CORS outermost),
    // each layer boxed by the router so response bodies stay `axum::body::Body`.
    routes::build_router(state)
        .layer(middleware::body_limit_layer(max_body_bytes))
        .layer(middleware::request_tracing::trace_layer())
        .layer(middleware::cors::cors_layer())
}
