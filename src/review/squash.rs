//! The fixup check and the squash workflow.

use tracing::{info, warn};

use crate::effects::{GitEffect, GitHubInterpreter, GitInterpreter, GitResponse, PrData};
use crate::git::GitError;
use crate::github::GitHubApiError;
use crate::response::Response;
use crate::types::{Issue, RepoId, Sha, StatusState};
use crate::webhooks::{IssueComment, PrAction, PullRequestEvent};

use super::commits::{ExpectedHead, get_commits, includes_fixup_commits};
use super::engine::{attempt, settle};
use super::{
    ReviewEngine, ReviewError, SQUASH_FAILURE_DESCRIPTION, SQUASH_PENDING_DESCRIPTION,
    SQUASH_SUCCESS_DESCRIPTION,
};

/// What asked for the fixup check.
#[derive(Debug, Clone)]
enum CheckTrigger {
    /// A push or a newly opened PR. The listing must end at the pushed head
    /// and the status goes on that head.
    Push { head_repo: RepoId, head_sha: Sha },
    /// `!check`: report only.
    Check,
    /// `!squash`: report, then squash if needed.
    Squash,
}

impl<H, G> ReviewEngine<H, G>
where
    H: GitHubInterpreter<Error = GitHubApiError> + Send + Sync + 'static,
    G: GitInterpreter<Error = GitError> + Send + Sync + 'static,
{
    /// Handles `!check`: reports whether the PR has commits to squash.
    pub async fn handle_check_command(&self, comment: &IssueComment) -> Response {
        self.check_for_fixup_commits(&comment.issue, CheckTrigger::Check)
            .await
    }

    /// Handles `!squash`: reports the fixup status and squashes if needed.
    ///
    /// Requires the commenter to be a collaborator.
    pub async fn handle_squash_command(&self, comment: &IssueComment) -> Response {
        match self.authorize(&comment.issue, &comment.commenter).await {
            Ok(None) => {}
            Ok(Some(refusal)) => return refusal,
            Err(err) => return err.into(),
        }
        self.check_for_fixup_commits(&comment.issue, CheckTrigger::Squash)
            .await
    }

    /// Checks newly opened and newly pushed PRs for fixup commits.
    pub async fn handle_pull_request_event(&self, event: &PullRequestEvent) -> Response {
        match &event.action {
            PrAction::Opened | PrAction::Synchronize => {}
            PrAction::Other(action) => {
                return Response::success(format!("PR action '{}'. Ignoring.", action));
            }
        }
        let trigger = CheckTrigger::Push {
            head_repo: event.head_repository.id.clone(),
            head_sha: event.head_sha.clone(),
        };
        self.check_for_fixup_commits(&event.issue, trigger).await
    }

    async fn check_for_fixup_commits(&self, issue: &Issue, trigger: CheckTrigger) -> Response {
        info!(issue = %issue, "Checking for fixup commits");
        let engine = self.clone();
        let retried_issue = issue.clone();
        let result = self
            .run_with_retries(move |_| {
                let engine = engine.clone();
                let issue = retried_issue.clone();
                let trigger = trigger.clone();
                async move { attempt(engine.check_once(&issue, &trigger).await) }
            })
            .await;

        settle(result, || {
            format!(
                "Continuing checking for fixup commits for PR {} asynchronously.",
                issue.full_name()
            )
        })
    }

    async fn check_once(&self, issue: &Issue, trigger: &CheckTrigger) -> Result<Response, ReviewError> {
        let expected = match trigger {
            CheckTrigger::Push { head_sha, .. } => ExpectedHead::Sha(head_sha.clone()),
            CheckTrigger::Check | CheckTrigger::Squash => ExpectedHead::Any,
        };
        let commits = get_commits(self.github(), issue, &expected).await?;
        let has_fixups = includes_fixup_commits(&commits);

        let (state, description) = if has_fixups {
            (StatusState::Pending, SQUASH_PENDING_DESCRIPTION)
        } else {
            (StatusState::Success, SQUASH_SUCCESS_DESCRIPTION)
        };

        match trigger {
            CheckTrigger::Push {
                head_repo,
                head_sha,
            } => {
                self.set_squash_status(head_repo, head_sha, state, description)
                    .await?;
                Ok(Response::success(description))
            }
            CheckTrigger::Check | CheckTrigger::Squash => {
                let pr = self.get_pr(issue).await?;
                self.set_squash_status(&pr.head.repository.id, &pr.head.sha, state, description)
                    .await?;
                if has_fixups && matches!(trigger, CheckTrigger::Squash) {
                    self.squash_and_report(&pr).await
                } else {
                    Ok(Response::success(description))
                }
            }
        }
    }

    /// Autosquashes the PR's head branch and reports the outcome as a status.
    ///
    /// A rebase conflict is reported on the PR and is not an error of the
    /// request. Any other git failure is.
    pub(super) async fn squash_and_report(&self, pr: &PrData) -> Result<Response, ReviewError> {
        info!(
            head = %pr.head.ref_name,
            base = %pr.base.ref_name,
            repo = %pr.head.repository,
            "Squashing the head branch before merging it into the base"
        );
        let effect = GitEffect::AutosquashAndPush {
            repo: pr.head.repository.clone(),
            upstream: format!("origin/{}", pr.base.ref_name),
            branch: pr.head.sha.to_string(),
            destination: pr.head.ref_name.clone(),
        };

        match self.interpret_git(effect).await {
            Ok(GitResponse::Pushed { head }) => {
                self.set_squash_status(
                    &pr.head.repository.id,
                    &head,
                    StatusState::Success,
                    SQUASH_SUCCESS_DESCRIPTION,
                )
                .await?;
                Ok(Response::success(format!(
                    "Squashed {} and pushed {}",
                    pr.head.ref_name,
                    head.short()
                )))
            }
            Ok(other) => Err(ReviewError::Internal {
                context: format!("Squashing answered with {:?}", other),
            }),
            Err(err) if err.is_squash_conflict() => {
                warn!(error = %err, "Failed to autosquash the commits; setting a failure status");
                self.set_squash_status(
                    &pr.head.repository.id,
                    &pr.head.sha,
                    StatusState::Failure,
                    SQUASH_FAILURE_DESCRIPTION,
                )
                .await?;
                Ok(Response::success(SQUASH_FAILURE_DESCRIPTION))
            }
            Err(source) => Err(ReviewError::Git {
                context: "Failed to squash the commits in the PR".to_string(),
                source,
            }),
        }
    }
}
