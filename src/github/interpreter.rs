//! GitHub effect interpreter using octocrab.
//!
//! Most effects go through octocrab's raw REST helpers with small private
//! response structs, which keeps the payloads we depend on explicit. Each
//! call is made exactly once; trying again is the review engine's decision.

use serde::{Deserialize, Serialize};

use crate::effects::{
    BranchData, COMMITS_PER_PAGE, CombinedStatusPage, CommitData, ContextStatus, GitHubEffect,
    GitHubInterpreter, GitHubResponse, IssueData, NewStatus, Page, PrData, SEARCH_PER_PAGE,
    STATUSES_PER_PAGE,
};
use crate::types::{PrNumber, RepoId, Repository, Sha, StatusState};

use super::client::OctocrabClient;
use super::error::GitHubApiError;

impl GitHubInterpreter for OctocrabClient {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
        match effect {
            GitHubEffect::GetPr { repo, pr } => get_pr(self, &repo, pr).await,
            GitHubEffect::ListCommits { repo, pr, page } => {
                list_commits(self, &repo, pr, page).await
            }
            GitHubEffect::Merge { repo, pr } => merge(self, &repo, pr).await,
            GitHubEffect::GetCombinedStatus {
                repo,
                reference,
                page,
            } => get_combined_status(self, &repo, &reference, page).await,
            GitHubEffect::CreateStatus { repo, sha, status } => {
                create_status(self, &repo, &sha, &status).await
            }
            GitHubEffect::AddLabel { repo, pr, label } => add_label(self, &repo, pr, label).await,
            GitHubEffect::RemoveLabel { repo, pr, label } => {
                remove_label(self, &repo, pr, &label).await
            }
            GitHubEffect::PostComment { repo, pr, body } => {
                post_comment(self, &repo, pr, body).await
            }
            GitHubEffect::SearchIssues { query, page } => search_issues(self, query, page).await,
            GitHubEffect::IsCollaborator { repo, user } => {
                is_collaborator(self, &repo, &user).await
            }
        }
    }
}

#[derive(Serialize)]
struct PageParams {
    per_page: u32,
    page: u32,
}

fn parse_sha(raw: &str, what: &str) -> Result<Sha, GitHubApiError> {
    Sha::parse(raw).map_err(|e| {
        GitHubApiError::permanent_without_source(format!("Invalid {} SHA: {}", what, e))
    })
}

// ─── Pull Requests ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawRepo {
    name: String,
    owner: RawUser,
    ssh_url: String,
}

#[derive(Debug, Deserialize)]
struct RawBranch {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: String,
    /// Null when the head fork has been deleted.
    repo: Option<RawRepo>,
}

#[derive(Debug, Deserialize)]
struct RawPull {
    number: u64,
    user: RawUser,
    #[serde(default)]
    merged: bool,
    mergeable: Option<bool>,
    head: RawBranch,
    base: RawBranch,
}

fn branch_data(raw: RawBranch, side: &str) -> Result<BranchData, GitHubApiError> {
    let repo = raw.repo.ok_or_else(|| {
        GitHubApiError::permanent_without_source(format!("PR {} repository is missing", side))
    })?;
    Ok(BranchData {
        sha: parse_sha(&raw.sha, side)?,
        ref_name: raw.ref_name,
        repository: Repository::new(repo.owner.login, repo.name, repo.ssh_url),
    })
}

fn pr_data(raw: RawPull) -> Result<PrData, GitHubApiError> {
    Ok(PrData {
        number: PrNumber(raw.number),
        author: raw.user.login,
        merged: raw.merged,
        mergeable: raw.mergeable,
        head: branch_data(raw.head, "head")?,
        base: branch_data(raw.base, "base")?,
    })
}

async fn get_pr(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!("/repos/{}/{}/pulls/{}", repo.owner, repo.repo, pr.0);
    let raw: RawPull = client
        .inner()
        .get(&url, None::<&()>)
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(GitHubResponse::Pr(pr_data(raw)?))
}

#[derive(Debug, Deserialize)]
struct RawParent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RawCommitDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    sha: String,
    #[serde(default)]
    parents: Vec<RawParent>,
    commit: RawCommitDetail,
}

fn commit_page(raw: Vec<RawCommit>) -> Result<Page<CommitData>, GitHubApiError> {
    let has_next_page = raw.len() >= COMMITS_PER_PAGE as usize;
    let items = raw
        .into_iter()
        .map(|commit| {
            Ok(CommitData {
                sha: parse_sha(&commit.sha, "commit")?,
                parents: commit
                    .parents
                    .iter()
                    .map(|parent| parse_sha(&parent.sha, "parent"))
                    .collect::<Result<_, _>>()?,
                message: commit.commit.message,
            })
        })
        .collect::<Result<_, GitHubApiError>>()?;
    Ok(Page {
        items,
        has_next_page,
    })
}

async fn list_commits(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
    page: u32,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!("/repos/{}/{}/pulls/{}/commits", repo.owner, repo.repo, pr.0);
    let params = PageParams {
        per_page: COMMITS_PER_PAGE,
        page,
    };
    let raw: Vec<RawCommit> = client
        .inner()
        .get(&url, Some(&params))
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(GitHubResponse::Commits(commit_page(raw)?))
}

#[derive(Debug, Deserialize)]
struct RawMergeResult {
    merged: bool,
    message: Option<String>,
}

async fn merge(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!("/repos/{}/{}/pulls/{}/merge", repo.owner, repo.repo, pr.0);

    // No commit_title or commit_message: GitHub writes its default message.
    #[derive(Serialize)]
    struct MergeRequest {
        merge_method: &'static str,
    }

    let request = MergeRequest {
        merge_method: "merge",
    };
    let result: RawMergeResult = client
        .inner()
        .put(&url, Some(&request))
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(GitHubResponse::Merge {
        merged: result.merged,
        message: result.message,
    })
}

// ─── Statuses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawContextStatus {
    context: String,
    state: StatusState,
}

#[derive(Debug, Deserialize)]
struct RawCombinedStatus {
    state: StatusState,
    total_count: u32,
    #[serde(default)]
    statuses: Vec<RawContextStatus>,
}

fn combined_status_page(raw: RawCombinedStatus, page: u32) -> CombinedStatusPage {
    CombinedStatusPage {
        state: raw.state,
        has_next_page: page.saturating_mul(STATUSES_PER_PAGE) < raw.total_count,
        statuses: raw
            .statuses
            .into_iter()
            .map(|s| ContextStatus {
                context: s.context,
                state: s.state,
            })
            .collect(),
    }
}

async fn get_combined_status(
    client: &OctocrabClient,
    repo: &RepoId,
    reference: &str,
    page: u32,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/commits/{}/status",
        repo.owner,
        repo.repo,
        urlencoding::encode(reference)
    );
    let params = PageParams {
        per_page: STATUSES_PER_PAGE,
        page,
    };
    let raw: RawCombinedStatus = client
        .inner()
        .get(&url, Some(&params))
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(GitHubResponse::CombinedStatus(combined_status_page(raw, page)))
}

async fn create_status(
    client: &OctocrabClient,
    repo: &RepoId,
    sha: &Sha,
    status: &NewStatus,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!("/repos/{}/{}/statuses/{}", repo.owner, repo.repo, sha);
    let _: serde_json::Value = client
        .inner()
        .post(&url, Some(status))
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(GitHubResponse::StatusCreated)
}

// ─── Issues ───────────────────────────────────────────────────────────────────

async fn add_label(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
    label: String,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!("/repos/{}/{}/issues/{}/labels", repo.owner, repo.repo, pr.0);

    #[derive(Serialize)]
    struct LabelsRequest {
        labels: Vec<String>,
    }

    let _: serde_json::Value = client
        .inner()
        .post(&url, Some(&LabelsRequest { labels: vec![label] }))
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(GitHubResponse::LabelAdded)
}

async fn remove_label(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
    label: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/issues/{}/labels/{}",
        repo.owner,
        repo.repo,
        pr.0,
        urlencoding::encode(label)
    );
    let _: serde_json::Value = client
        .inner()
        .delete(&url, None::<&()>)
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(GitHubResponse::LabelRemoved)
}

async fn post_comment(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
    body: String,
) -> Result<GitHubResponse, GitHubApiError> {
    client
        .inner()
        .issues(&repo.owner, &repo.repo)
        .create_comment(pr.0, body)
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(GitHubResponse::CommentPosted)
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    user: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawSearchResult {
    #[serde(default)]
    items: Vec<RawIssue>,
}

fn issue_page(raw: RawSearchResult) -> Page<IssueData> {
    let has_next_page = raw.items.len() >= SEARCH_PER_PAGE as usize;
    Page {
        items: raw
            .items
            .into_iter()
            .map(|issue| IssueData {
                number: PrNumber(issue.number),
                author: issue.user.login,
            })
            .collect(),
        has_next_page,
    }
}

async fn search_issues(
    client: &OctocrabClient,
    query: String,
    page: u32,
) -> Result<GitHubResponse, GitHubApiError> {
    #[derive(Serialize)]
    struct SearchParams {
        q: String,
        per_page: u32,
        page: u32,
    }

    let params = SearchParams {
        q: query,
        per_page: SEARCH_PER_PAGE,
        page,
    };
    let raw: RawSearchResult = client
        .inner()
        .get("/search/issues", Some(&params))
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(GitHubResponse::Issues(issue_page(raw)))
}

// ─── Repository ───────────────────────────────────────────────────────────────

async fn is_collaborator(
    client: &OctocrabClient,
    repo: &RepoId,
    user: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    let is_collaborator = client
        .inner()
        .repos(&repo.owner, &repo.repo)
        .is_collaborator(user)
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(GitHubResponse::Collaborator(is_collaborator))
}
