//! HTTP server for the review helper.
//!
//! # Endpoints
//!
//! - `POST /webhook` - Accepts GitHub webhook deliveries and answers once the
//!   first try of the triggered workflow has finished
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

use crate::effects::{GitHubInterpreter, GitInterpreter};
use crate::git::GitError;
use crate::github::GitHubApiError;
use crate::review::ReviewEngine;
use crate::webhooks::WebhookSecret;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::{WebhookError, webhook_handler};

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
pub struct AppState<H, G> {
    inner: Arc<AppStateInner<H, G>>,
}

struct AppStateInner<H, G> {
    engine: ReviewEngine<H, G>,

    /// Secret for verifying `X-Hub-Signature-256`.
    secret: WebhookSecret,
}

impl<H, G> Clone for AppState<H, G> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H, G> AppState<H, G> {
    pub fn new(engine: ReviewEngine<H, G>, secret: WebhookSecret) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { engine, secret }),
        }
    }

    pub fn engine(&self) -> &ReviewEngine<H, G> {
        &self.inner.engine
    }

    pub fn secret(&self) -> &WebhookSecret {
        &self.inner.secret
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<H, G>(app_state: AppState<H, G>) -> axum::Router
where
    H: GitHubInterpreter<Error = GitHubApiError> + Send + Sync + 'static,
    G: GitInterpreter<Error = GitError> + Send + Sync + 'static,
{
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler::<H, G>))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
