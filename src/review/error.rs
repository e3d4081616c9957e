//! Errors of the review workflow and how they surface over HTTP.

use std::error::Error as _;

use axum::http::StatusCode;
use thiserror::Error;

use crate::git::GitError;
use crate::github::GitHubApiError;
use crate::response::Response;
use crate::retry::ScheduleError;
use crate::types::Sha;

/// A failure while checking, squashing or merging a PR.
///
/// Variants that come from GitHub map to 502 Bad Gateway; local failures
/// map to 500. [`is_retryable`](Self::is_retryable) marks the conditions
/// that are expected to clear up on their own.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// A GitHub API call failed.
    #[error("{context}")]
    GitHub {
        context: String,
        #[source]
        source: GitHubApiError,
    },

    /// GitHub answered an effect with a response of the wrong shape.
    #[error("{context}: unexpected response from GitHub")]
    UnexpectedResponse { context: String },

    /// The commit listing 404ed, as it does briefly after a push.
    #[error("Commits for {issue} are not available yet")]
    CommitsNotListed {
        issue: String,
        #[source]
        source: GitHubApiError,
    },

    /// The commit listing ends at a commit other than the event's head.
    #[error("Commit listing for {issue} ends at {head}, not at the pushed head")]
    StaleHead { issue: String, head: Sha },

    /// The commit listing does not form a single line of history.
    #[error("Commit listing for {issue} has {count} head commits instead of one")]
    AmbiguousHead { issue: String, count: usize },

    /// The head branch moved while the merge was being made.
    #[error("The head of {issue} was modified during the merge")]
    HeadModified {
        issue: String,
        #[source]
        source: GitHubApiError,
    },

    /// GitHub accepted the merge request but did not merge.
    #[error("Merging {issue} succeeded but the PR was not merged: {message}")]
    NotMerged { issue: String, message: String },

    /// A local git operation failed.
    #[error("{context}")]
    Git {
        context: String,
        #[source]
        source: GitError,
    },

    /// An internal invariant did not hold.
    #[error("{context}")]
    Internal { context: String },

    #[error("Failed to schedule the operation")]
    Schedule(#[from] ScheduleError),
}

impl ReviewError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReviewError::GitHub { .. }
            | ReviewError::UnexpectedResponse { .. }
            | ReviewError::CommitsNotListed { .. }
            | ReviewError::StaleHead { .. }
            | ReviewError::HeadModified { .. }
            | ReviewError::NotMerged { .. } => StatusCode::BAD_GATEWAY,
            ReviewError::AmbiguousHead { .. }
            | ReviewError::Git { .. }
            | ReviewError::Internal { .. }
            | ReviewError::Schedule(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true if trying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReviewError::CommitsNotListed { .. }
                | ReviewError::StaleHead { .. }
                | ReviewError::HeadModified { .. }
        )
    }
}

impl From<ReviewError> for Response {
    fn from(err: ReviewError) -> Self {
        let response = Response::error(err.status_code(), err.to_string());
        match err.source() {
            Some(source) => response.with_cause(source),
            None => response,
        }
    }
}
