//! API module
//!
//! HTTP API endpoints, middleware and wire resources.

pub mod middleware;
pub mod resources;
pub mod routes;

use axum::{middleware::from_fn, middleware::from_fn_with_state, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use routes::create_router;

/// Build the full application router
///
/// Layers run outside-in: logging → auth → handler. `/health` skips auth.
pub fn app(state: AppState) -> Router {
    let protected_routes = create_router().layer(from_fn_with_state(
        state.clone(),
        middleware::auth_middleware,
    ));

    Router::new()
        // Health check (no auth)
        .route("/health", get(health_check))
        .nest("/api", protected_routes)
        .layer(from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
