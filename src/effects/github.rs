//! GitHub API effect types.
//!
//! These types describe GitHub API operations as data, without executing them.
//! Every effect names the repository it targets, because a single event can
//! touch two repositories (a fork's head branch and the upstream base).

use serde::Serialize;

use crate::types::{PrNumber, RepoId, Repository, Sha, StatusState};

/// Page size used for commit listings.
pub const COMMITS_PER_PAGE: u32 = 30;

/// Page size used for combined statuses.
pub const STATUSES_PER_PAGE: u32 = 100;

/// Page size used for issue searches.
pub const SEARCH_PER_PAGE: u32 = 100;

/// A GitHub API effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GitHubEffect {
    // ─── Pull Requests ────────────────────────────────────────────────────────
    /// Fetch a single PR by number.
    GetPr { repo: RepoId, pr: PrNumber },

    /// Fetch one page (1-based) of a PR's commits.
    ListCommits {
        repo: RepoId,
        pr: PrNumber,
        page: u32,
    },

    /// Merge a PR with the `merge` method and GitHub's default message.
    Merge { repo: RepoId, pr: PrNumber },

    // ─── Statuses ─────────────────────────────────────────────────────────────
    /// Fetch one page (1-based) of the combined status for a ref.
    GetCombinedStatus {
        repo: RepoId,
        reference: String,
        page: u32,
    },

    /// Create a commit status.
    CreateStatus {
        repo: RepoId,
        sha: Sha,
        status: NewStatus,
    },

    // ─── Issues ───────────────────────────────────────────────────────────────
    /// Add a label to a PR.
    AddLabel {
        repo: RepoId,
        pr: PrNumber,
        label: String,
    },

    /// Remove a label from a PR.
    RemoveLabel {
        repo: RepoId,
        pr: PrNumber,
        label: String,
    },

    /// Post a new comment on a PR.
    PostComment {
        repo: RepoId,
        pr: PrNumber,
        body: String,
    },

    /// Fetch one page (1-based) of issue search results.
    SearchIssues { query: String, page: u32 },

    // ─── Repository ───────────────────────────────────────────────────────────
    /// Check whether `user` is a collaborator on the repository.
    IsCollaborator { repo: RepoId, user: String },
}

// ─── Request Types ────────────────────────────────────────────────────────────

/// A commit status to create.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NewStatus {
    pub state: StatusState,
    pub context: String,
    pub description: String,
}

// ─── Response Types ───────────────────────────────────────────────────────────

/// One side (head or base) of a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchData {
    /// The branch name.
    pub ref_name: String,
    /// The commit the branch points at.
    pub sha: Sha,
    /// The repository the branch lives in.
    pub repository: Repository,
}

/// PR data returned from the GitHub API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrData {
    pub number: PrNumber,
    /// Login of the PR author.
    pub author: String,
    pub merged: bool,
    /// `None` while GitHub is still computing mergeability.
    pub mergeable: Option<bool>,
    pub head: BranchData,
    pub base: BranchData,
}

impl PrData {
    /// Returns true if the head branch lives in a different repository than
    /// the base branch.
    pub fn is_cross_fork(&self) -> bool {
        self.head.repository.id != self.base.repository.id
    }
}

/// A commit in a PR's commit listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitData {
    pub sha: Sha,
    pub parents: Vec<Sha>,
    pub message: String,
}

/// A single context's status within a combined status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextStatus {
    pub context: String,
    pub state: StatusState,
}

/// One page of a combined status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedStatusPage {
    /// The aggregate state as of this page's request.
    pub state: StatusState,
    pub statuses: Vec<ContextStatus>,
    pub has_next_page: bool,
}

/// An issue from search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueData {
    pub number: PrNumber,
    pub author: String,
}

/// A page of results from a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next_page: bool,
}

/// Response from a GitHub effect.
///
/// Each variant corresponds to the response from a particular effect type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubResponse {
    /// Response to `GetPr`.
    Pr(PrData),

    /// Response to `ListCommits`.
    Commits(Page<CommitData>),

    /// Response to `Merge`.
    Merge {
        merged: bool,
        message: Option<String>,
    },

    /// Response to `GetCombinedStatus`.
    CombinedStatus(CombinedStatusPage),

    /// Response to `CreateStatus`.
    StatusCreated,

    /// Response to `AddLabel`.
    LabelAdded,

    /// Response to `RemoveLabel`.
    LabelRemoved,

    /// Response to `PostComment`.
    CommentPosted,

    /// Response to `SearchIssues`.
    Issues(Page<IssueData>),

    /// Response to `IsCollaborator`.
    Collaborator(bool),
}
