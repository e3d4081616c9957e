//! The outcome of handling one webhook delivery.
//!
//! Every entry point of the review engine returns a [`Response`]. The HTTP
//! layer writes it; operations that finish in the background only log it.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{error, info};

/// A success message or an error with the HTTP status it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Success {
        message: String,
    },
    Error {
        status: StatusCode,
        message: String,
        /// The underlying failure, logged but never sent to the caller.
        cause: Option<String>,
    },
}

impl Response {
    pub fn success(message: impl Into<String>) -> Self {
        Response::Success {
            message: message.into(),
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Response::Error {
            status,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(self, cause: impl std::fmt::Display) -> Self {
        match self {
            Response::Error {
                status, message, ..
            } => Response::Error {
                status,
                message,
                cause: Some(cause.to_string()),
            },
            success => success,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Response::Success { .. } => StatusCode::OK,
            Response::Error { status, .. } => *status,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Response::Success { message } | Response::Error { message, .. } => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }

    /// Logs the response at a level matching its outcome.
    pub fn log(&self, context: &str) {
        match self {
            Response::Success { message } => info!(message = %message, "{}", context),
            Response::Error {
                status,
                message,
                cause,
            } => error!(
                status = status.as_u16(),
                message = %message,
                cause = cause.as_deref().unwrap_or("none"),
                "{}",
                context
            ),
        }
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        self.log("Responding to the HTTP request");
        let status = self.status();
        match self {
            Response::Success { message } | Response::Error { message, .. } => {
                (status, message).into_response()
            }
        }
    }
}
