//! HTTP error mapping (spec §7 "User-visible behavior"): every handler
//! returns `Result<_, ApiError>` and this is the single place
//! [`moduly_error::Error`] is translated to a status code and JSON
//! body, mirroring the teacher pack's `WorkflowApiError` `IntoResponse`
//! shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

/// A handler-facing error wrapping the shared taxonomy.
///
/// [`moduly_error::Error::http_status`] already encodes spec §7's
/// "HTTP status closest in semantics" table; this type's only job is
/// to render that status with a JSON body axum can return.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub moduly_error::Error);

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.http_status();
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "internal error");
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let err = ApiError(moduly_error::Error::not_found("Run", "r1"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn overloaded_maps_to_503() {
        let err = ApiError(moduly_error::Error::Overloaded { depth: 10, max: 5 });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn workflow_timeout_maps_to_504() {
        let err = ApiError(moduly_error::Error::WorkflowTimeout {
            elapsed: std::time::Duration::from_secs(600),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
