//! Webhook endpoint handler.
//!
//! Verifies the delivery's signature, parses it, and runs the triggered
//! workflow. The response reflects the outcome of the workflow's first try;
//! later tries continue in the background.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::effects::{GitHubInterpreter, GitInterpreter};
use crate::git::GitError;
use crate::github::GitHubApiError;
use crate::response::Response;
use crate::webhooks::{ParseError, SignatureError, dispatch, parse_webhook};

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID, logged when present.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Reasons a delivery is rejected before any workflow runs.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing {0} header")]
    MissingHeader(&'static str),

    #[error("Invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] ParseError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            WebhookError::MissingHeader(HEADER_SIGNATURE) => StatusCode::UNAUTHORIZED,
            WebhookError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature(_) => StatusCode::FORBIDDEN,
            WebhookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        };
        warn!(status = status.as_u16(), error = %self, "Rejecting webhook delivery");
        (status, self.to_string()).into_response()
    }
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Required headers:
///   - `X-GitHub-Event`: Event type (e.g., "pull_request", "issue_comment")
///   - `X-Hub-Signature-256`: HMAC-SHA256 signature of the payload
/// - Body: JSON webhook payload
///
/// # Response
///
/// - 200 OK: Event handled or deliberately ignored
/// - 400 Bad Request: Missing event header or malformed payload
/// - 401 Unauthorized: Missing signature
/// - 403 Forbidden: Signature does not match
/// - 500 / 502: The workflow failed locally / at GitHub
pub async fn webhook_handler<H, G>(
    State(app_state): State<AppState<H, G>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookError>
where
    H: GitHubInterpreter<Error = GitHubApiError> + Send + Sync + 'static,
    G: GitInterpreter<Error = GitError> + Send + Sync + 'static,
{
    // Verify signature BEFORE any parsing.
    let signature = get_header(&headers, HEADER_SIGNATURE)?;
    app_state.secret().verify(&body, signature)?;

    let event_type = get_header(&headers, HEADER_EVENT)?;
    let delivery = headers
        .get(HEADER_DELIVERY)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    debug!(delivery, event_type, "Received webhook");

    let Some(event) = parse_webhook(event_type, &body)? else {
        return Ok(Response::success("Not an event I understand. Ignoring."));
    };

    let response = dispatch(app_state.engine(), event).await;
    info!(delivery, event_type, status = response.status().as_u16(), "Handled webhook");
    Ok(response)
}

/// Extracts a required header value as a string.
fn get_header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingHeader(name))
}
