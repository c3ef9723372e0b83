//! The Gateway's axum [`Router`] (spec §6 "Run API"): wires the five
//! run endpoints behind `tower-http`'s trace/compression/timeout
//! layers, with a permissive CORS layer scoped to `/run-public` only,
//! matching spec §6's "`Access-Control-Allow-Origin: *`" note for that
//! one route.

use std::time::Duration;

use axum::http::header::CONNECTION;
use axum::http::{HeaderName, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::routes::run;
use crate::state::GatewayState;

/// spec §6 event-stream framing: tell reverse proxies not to buffer the
/// SSE response and keep the underlying connection alive for it.
fn sse_headers() -> (SetResponseHeaderLayer<HeaderValue>, SetResponseHeaderLayer<HeaderValue>) {
    (
        SetResponseHeaderLayer::overriding(CONNECTION, HeaderValue::from_static("keep-alive")),
        SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        ),
    )
}

/// Build the Gateway's router over its shared state.
#[must_use]
pub fn gateway_router(state: GatewayState) -> Router {
    let run_deadline = state.config.run_deadline;
    let (connection_header, no_buffering_header) = sse_headers();

    let public_streaming_routes = Router::new()
        .route("/run-public/:slug", post(run::run_public))
        .layer(connection_header.clone())
        .layer(no_buffering_header.clone())
        .layer(CorsLayer::permissive());

    let public_routes = Router::new()
        .route("/deployments/public/:slug/info", get(run::deployment_public_info))
        .layer(CorsLayer::permissive());

    let authenticated_streaming_routes =
        Router::new().route("/run/:slug", post(run::run)).layer(connection_header).layer(no_buffering_header);

    let authenticated_routes = Router::new()
        .route("/run-async/:slug", post(run::run_async))
        .route("/run-status/:run_id", get(run::run_status));

    Router::new()
        .merge(public_streaming_routes)
        .merge(public_routes)
        .merge(authenticated_streaming_routes)
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(run_deadline + Duration::from_secs(5)))
        .with_state(state)
}
