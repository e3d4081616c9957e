//! Liveness endpoint.

use axum::http::StatusCode;

/// Answers `GET /health` with 200 and the text "OK" while the server accepts
/// connections.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
