//! GitHub webhook event types.
//!
//! Typed views of the three webhook events the review helper acts on:
//!
//! - `issue_comment` carries the `!squash`, `!check` and `!merge` commands
//! - `pull_request` triggers a fixup check when a PR is opened or pushed to
//! - `status` triggers merges of labelled PRs once CI reports success


use crate::types::{Issue, Repository, Sha, StatusState};

/// A parsed GitHub webhook event.
///
/// Event types the service does not handle never become a `GitHubEvent`;
/// the parser returns `None` for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubEvent {
    IssueComment(IssueComment),
    PullRequest(PullRequestEvent),
    Status(StatusEvent),
}

/// Action performed on an issue comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommentAction {
    Created,
    Edited,
    Deleted,
    Other(String),
}

/// A comment on an issue or pull request.
///
/// PR conversation comments arrive as issue comments; `is_pull_request`
/// tells them apart from comments on plain issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    pub action: CommentAction,
    /// The commented issue. `author` is the issue's (or PR's) author.
    pub issue: Issue,
    pub is_pull_request: bool,
    pub body: String,
    /// Login of the user who wrote the comment.
    pub commenter: String,
}

/// Action performed on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrAction {
    Opened,
    Synchronize,
    /// Any other action, kept so it can be answered explicitly.
    Other(String),
}

/// A pull request lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub action: PrAction,
    /// The PR as an issue of the base repository.
    pub issue: Issue,
    pub head_sha: Sha,
    /// The repository the head branch lives in. Differs from the issue's
    /// repository for cross-fork PRs.
    pub head_repository: Repository,
}

/// A commit status update (Status API).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub sha: Sha,
    pub state: StatusState,
    pub context: String,
    /// Head commits of the branches GitHub reports as containing `sha`.
    pub branch_heads: Vec<Sha>,
    pub repository: Repository,
}

impl StatusEvent {
    /// Returns true if `sha` is the head commit of one of the reported branches.
    pub fn is_branch_head(&self) -> bool {
        self.branch_heads.contains(&self.sha)
    }
}
