//! GitHub API error types.
//!
//! Failures are sorted into kinds so the review engine can decide what to do
//! without re-inspecting octocrab errors:
//!
//! - **Transient** errors are worth another try (5xx, rate limits, network).
//! - **Permanent** errors will not change by trying again.
//! - **HeadModified** is the 409 GitHub returns when the PR head moved
//!   between reading it and merging it. The PR must be re-read first.

use std::fmt;
use thiserror::Error;

/// The kind of GitHub API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// HTTP 5xx, 429, a rate-limited 403, or a network-level failure.
    Transient,

    /// Everything else, including most 4xx responses.
    Permanent,

    /// HTTP 409 "Head branch was modified" on merge.
    HeadModified,
}

impl GitHubErrorKind {
    /// Returns true if the same request may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(self, GitHubErrorKind::Transient)
    }
}

/// A classified GitHub API error.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if the request got that far.
    pub status_code: Option<u16>,

    pub message: String,

    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    /// Creates a permanent error without an octocrab source.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error for a known status code without an octocrab source.
    ///
    /// Classification matches [`from_octocrab`](Self::from_octocrab).
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: classify(Some(status_code), &message),
            status_code: Some(status_code),
            message,
            source: None,
        }
    }

    /// Classifies an octocrab error.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let (status_code, message) = match &err {
            octocrab::Error::GitHub { source, .. } => {
                (Some(source.status_code.as_u16()), source.message.clone())
            }
            other => {
                let message = other.to_string();
                (extract_status_code(&message), message)
            }
        };

        Self {
            kind: classify(status_code, &message),
            status_code,
            message,
            source: Some(err),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    pub fn is_head_modified(&self) -> bool {
        self.kind == GitHubErrorKind::HeadModified
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }

    /// True for any 409, including [`HeadModified`](GitHubErrorKind::HeadModified).
    pub fn is_conflict(&self) -> bool {
        self.status_code == Some(409)
    }

    pub fn is_method_not_allowed(&self) -> bool {
        self.status_code == Some(405)
    }
}

fn classify(status_code: Option<u16>, message: &str) -> GitHubErrorKind {
    match status_code {
        Some(409) if is_head_modified_message(message) => GitHubErrorKind::HeadModified,
        Some(429) => GitHubErrorKind::Transient,
        Some(403) if is_rate_limit_error(message) => GitHubErrorKind::Transient,
        Some(code) if (500..600).contains(&code) => GitHubErrorKind::Transient,
        Some(_) => GitHubErrorKind::Permanent,
        None if is_network_error(message) => GitHubErrorKind::Transient,
        None => GitHubErrorKind::Permanent,
    }
}

/// Fallback for octocrab errors that carry no structured status, such as
/// HTTP-layer failures whose message embeds the code.
fn extract_status_code(message: &str) -> Option<u16> {
    let idx = message.find("status: ")?;
    let digits: String = message[idx + 8..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Checks the merge endpoint's message for a moved head.
pub fn is_head_modified_message(message: &str) -> bool {
    message.to_lowercase().contains("head branch was modified")
}

fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}

fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("timed out")
        || message_lower.contains("connection")
        || message_lower.contains("dns")
}
