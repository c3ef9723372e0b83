//! The Sandbox service's axum [`Router`] (spec §6 "Sandbox API").

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::routes::sandbox;
use crate::state::SandboxState;

/// Build the sandbox service's router over its shared state.
#[must_use]
pub fn sandbox_router(state: SandboxState) -> Router {
    Router::new()
        .route("/v1/sandbox/execute", post(sandbox::execute))
        .route("/v1/sandbox/metrics", get(sandbox::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
