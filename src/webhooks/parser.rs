//! GitHub webhook payload parser.
//!
//! Turns raw webhook JSON into typed [`GitHubEvent`] values.
//!
//! 1. The event type comes from the `X-GitHub-Event` header.
//! 2. The payload is parsed according to the event type.
//! 3. Unknown event types return `Ok(None)`; they are answered, not rejected.
//! 4. Malformed payloads return `Err` with details.

use serde::Deserialize;
use thiserror::Error;

use crate::types::{Issue, PrNumber, Repository, Sha, StatusState};

use super::events::{
    CommentAction, GitHubEvent, IssueComment, PrAction, PullRequestEvent, StatusEvent,
};

/// Error type for webhook parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A field has an invalid value, such as a malformed SHA.
    #[error("invalid field value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Parses a webhook payload into a typed event.
///
/// * `Ok(Some(event))` - a known event type
/// * `Ok(None)` - an event type the service does not handle
/// * `Err(e)` - malformed payload or missing required fields
///
/// # Examples
///
/// ```
/// use review_helper::webhooks::parse_webhook;
///
/// let payload = br#"{
///     "action": "created",
///     "comment": { "body": "!check", "user": { "login": "octocat" } },
///     "issue": {
///         "number": 42,
///         "user": { "login": "author" },
///         "pull_request": { "url": "..." }
///     },
///     "repository": {
///         "name": "widgets",
///         "owner": { "login": "acme" },
///         "ssh_url": "git@github.com:acme/widgets.git"
///     }
/// }"#;
///
/// let event = parse_webhook("issue_comment", payload).unwrap();
/// assert!(event.is_some());
/// ```
pub fn parse_webhook(event_type: &str, payload: &[u8]) -> Result<Option<GitHubEvent>, ParseError> {
    match event_type {
        "issue_comment" => parse_issue_comment(payload).map(|e| Some(GitHubEvent::IssueComment(e))),
        "pull_request" => parse_pull_request(payload).map(|e| Some(GitHubEvent::PullRequest(e))),
        "status" => parse_status(payload).map(|e| Some(GitHubEvent::Status(e))),
        _ => Ok(None),
    }
}

// ============================================================================
// Raw payload structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawRepository {
    name: String,
    owner: RawUser,
    ssh_url: String,
}

impl From<RawRepository> for Repository {
    fn from(raw: RawRepository) -> Self {
        Repository::new(raw.owner.login, raw.name, raw.ssh_url)
    }
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

fn parse_sha(field: &'static str, raw: &str) -> Result<Sha, ParseError> {
    Sha::parse(raw).map_err(|_| ParseError::InvalidField {
        field,
        value: raw.to_string(),
    })
}

// ============================================================================
// issue_comment event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawIssueCommentPayload {
    action: String,
    comment: RawComment,
    issue: RawIssue,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    body: Option<String>,
    user: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    user: RawUser,
    // Present only when the issue is a PR
    pull_request: Option<serde_json::Value>,
}

fn parse_issue_comment(payload: &[u8]) -> Result<IssueComment, ParseError> {
    let raw: RawIssueCommentPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "created" => CommentAction::Created,
        "edited" => CommentAction::Edited,
        "deleted" => CommentAction::Deleted,
        other => CommentAction::Other(other.to_string()),
    };

    Ok(IssueComment {
        action,
        is_pull_request: raw.issue.pull_request.is_some(),
        issue: Issue {
            number: PrNumber(raw.issue.number),
            repository: raw.repository.into(),
            author: raw.issue.user.login,
        },
        body: raw.comment.body.unwrap_or_default(),
        commenter: raw.comment.user.login,
    })
}

// ============================================================================
// pull_request event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    action: String,
    pull_request: RawPullRequest,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    user: RawUser,
    head: RawHead,
}

#[derive(Debug, Deserialize)]
struct RawHead {
    sha: String,
    // Null once the head fork has been deleted
    repo: Option<RawRepository>,
}

fn parse_pull_request(payload: &[u8]) -> Result<PullRequestEvent, ParseError> {
    let raw: RawPullRequestPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "opened" => PrAction::Opened,
        "synchronize" => PrAction::Synchronize,
        other => PrAction::Other(other.to_string()),
    };

    let head_sha = parse_sha("pull_request.head.sha", &raw.pull_request.head.sha)?;
    let repository: Repository = raw.repository.into();
    let head_repository = match raw.pull_request.head.repo {
        Some(repo) => repo.into(),
        // Only an ignored action can arrive without a head repository
        None if matches!(action, PrAction::Other(_)) => repository.clone(),
        None => {
            return Err(ParseError::InvalidField {
                field: "pull_request.head.repo",
                value: "null".to_string(),
            });
        }
    };

    Ok(PullRequestEvent {
        action,
        issue: Issue {
            number: PrNumber(raw.pull_request.number),
            repository,
            author: raw.pull_request.user.login,
        },
        head_sha,
        head_repository,
    })
}

// ============================================================================
// status event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawStatusPayload {
    sha: String,
    state: String,
    context: String,
    #[serde(default)]
    branches: Vec<RawBranch>,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawBranch {
    commit: RawBranchCommit,
}

#[derive(Debug, Deserialize)]
struct RawBranchCommit {
    sha: String,
}

fn parse_status(payload: &[u8]) -> Result<StatusEvent, ParseError> {
    let raw: RawStatusPayload = serde_json::from_slice(payload)?;

    let state: StatusState = raw.state.parse().map_err(|_| ParseError::InvalidField {
        field: "state",
        value: raw.state.clone(),
    })?;

    let branch_heads = raw
        .branches
        .iter()
        .map(|branch| parse_sha("branches.commit.sha", &branch.commit.sha))
        .collect::<Result<_, _>>()?;

    Ok(StatusEvent {
        sha: parse_sha("sha", &raw.sha)?,
        state,
        context: raw.context,
        branch_heads,
        repository: raw.repository.into(),
    })
}
