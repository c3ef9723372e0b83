//! The retrieval service's axum [`Router`].

use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::routes::retrieval;
use crate::state::RetrievalState;

/// Build the retrieval service's router over its shared state.
#[must_use]
pub fn retrieval_router(state: RetrievalState) -> Router {
    Router::new()
        .route("/v1/retrieval/search", post(retrieval::search_documents))
        .route("/v1/retrieval/sync", post(retrieval::sync))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
