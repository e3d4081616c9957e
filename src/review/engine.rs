//! The review engine and the GitHub calls its workflows share.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::effects::{
    GitEffect, GitHubEffect, GitHubInterpreter, GitHubResponse, GitInterpreter, GitResponse, NewStatus,
    PrData,
};
use crate::git::GitError;
use crate::github::GitHubApiError;
use crate::response::Response;
use crate::retry::{Attempt, Eventual, RetryScheduler, TryInfo};
use crate::types::{Issue, RepoId, Sha, StatusState};

use super::{MERGING_LABEL, ReviewError, SQUASH_CONTEXT};

/// Drives the squash, check and merge workflows.
///
/// Generic over the GitHub and git interpreters so the workflows can run
/// against scripted mocks. Cloning is cheap; clones share the interpreters
/// and the retry scheduler.
pub struct ReviewEngine<H, G> {
    inner: Arc<EngineInner<H, G>>,
}

struct EngineInner<H, G> {
    github: H,
    git: G,
    scheduler: RetryScheduler,
    /// Delays before each try of a retried operation.
    tries: Vec<Duration>,
}

impl<H, G> Clone for ReviewEngine<H, G> {
    fn clone(&self) -> Self {
        ReviewEngine {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H, G> ReviewEngine<H, G> {
    pub fn new(github: H, git: G, scheduler: RetryScheduler, tries: Vec<Duration>) -> Self {
        ReviewEngine {
            inner: Arc::new(EngineInner {
                github,
                git,
                scheduler,
                tries,
            }),
        }
    }

    pub fn github(&self) -> &H {
        &self.inner.github
    }

    pub fn git(&self) -> &G {
        &self.inner.git
    }

    pub fn scheduler(&self) -> &RetryScheduler {
        &self.inner.scheduler
    }
}

/// Turns the result of one try into an [`Attempt`] for the scheduler.
pub(super) fn attempt(result: Result<Response, ReviewError>) -> Attempt<Response> {
    match result {
        Ok(response) => Attempt::done(response),
        Err(err) if err.is_retryable() => Attempt::retry(err.into()),
        Err(err) => Attempt::done(err.into()),
    }
}

/// Answers the HTTP request for an operation that may still be running.
pub(super) fn settle(
    result: Result<Eventual<Response>, ReviewError>,
    continuing: impl FnOnce() -> String,
) -> Response {
    match result {
        Ok(Eventual::Completed(response)) => response,
        Ok(Eventual::InProgress(_)) => Response::success(continuing()),
        Err(err) => err.into(),
    }
}

impl<H, G> ReviewEngine<H, G>
where
    H: GitHubInterpreter<Error = GitHubApiError> + Send + Sync + 'static,
    G: GitInterpreter<Error = GitError> + Send + Sync + 'static,
{
    /// Runs `operation` on the engine's try schedule.
    pub(super) async fn run_with_retries<F, Fut>(
        &self,
        operation: F,
    ) -> Result<Eventual<Response>, ReviewError>
    where
        F: FnMut(TryInfo) -> Fut + Send + 'static,
        Fut: Future<Output = Attempt<Response>> + Send + 'static,
    {
        let eventual = self
            .inner
            .scheduler
            .run_with_retries(&self.inner.tries, operation)
            .await?;
        Ok(eventual)
    }

    async fn call(
        &self,
        effect: GitHubEffect,
        context: impl FnOnce() -> String,
    ) -> Result<GitHubResponse, ReviewError> {
        self.inner
            .github
            .interpret(effect)
            .await
            .map_err(|source| {
                let context = context();
                warn!(transient = source.is_transient(), error = %source, "{}", context);
                ReviewError::GitHub { context, source }
            })
    }

    pub(super) async fn interpret_git(
        &self,
        effect: GitEffect,
    ) -> Result<GitResponse, GitError> {
        self.inner.git.interpret(effect).await
    }

    /// Like [`call`](Self::call) but hands back the raw API error, for
    /// callers that branch on its status code.
    pub(super) async fn interpret_github(
        &self,
        effect: GitHubEffect,
    ) -> Result<GitHubResponse, GitHubApiError> {
        self.inner.github.interpret(effect).await
    }

    pub(super) async fn get_pr(&self, issue: &Issue) -> Result<PrData, ReviewError> {
        let effect = GitHubEffect::GetPr {
            repo: issue.repo().clone(),
            pr: issue.number,
        };
        match self.call(effect, || format!("Failed to get PR {}", issue)).await? {
            GitHubResponse::Pr(pr) => Ok(pr),
            _ => Err(ReviewError::UnexpectedResponse {
                context: format!("Getting PR {}", issue),
            }),
        }
    }

    /// Reports the squash status for a commit.
    pub(super) async fn set_squash_status(
        &self,
        repo: &RepoId,
        sha: &Sha,
        state: StatusState,
        description: &str,
    ) -> Result<(), ReviewError> {
        self.set_status(repo, sha, SQUASH_CONTEXT, state, description).await
    }

    pub(super) async fn set_status(
        &self,
        repo: &RepoId,
        sha: &Sha,
        context: &str,
        state: StatusState,
        description: &str,
    ) -> Result<(), ReviewError> {
        info!(repo = %repo, sha = %sha.short(), context, state = %state, "Setting a commit status");
        let effect = GitHubEffect::CreateStatus {
            repo: repo.clone(),
            sha: sha.clone(),
            status: NewStatus {
                state,
                context: context.to_string(),
                description: description.to_string(),
            },
        };
        self.call(effect, || {
            format!("Failed to set the {} {} status on {}@{}", state, context, repo, sha.short())
        })
        .await?;
        Ok(())
    }

    pub(super) async fn add_merging_label(&self, issue: &Issue) -> Result<(), ReviewError> {
        let effect = GitHubEffect::AddLabel {
            repo: issue.repo().clone(),
            pr: issue.number,
            label: MERGING_LABEL.to_string(),
        };
        self.call(effect, || {
            format!("Failed to add the '{}' label to {}", MERGING_LABEL, issue)
        })
        .await?;
        Ok(())
    }

    pub(super) async fn remove_merging_label(&self, issue: &Issue) -> Result<(), ReviewError> {
        let effect = GitHubEffect::RemoveLabel {
            repo: issue.repo().clone(),
            pr: issue.number,
            label: MERGING_LABEL.to_string(),
        };
        self.call(effect, || {
            format!("Failed to remove the '{}' label from {}", MERGING_LABEL, issue)
        })
        .await?;
        Ok(())
    }

    pub(super) async fn post_comment(&self, issue: &Issue, body: String) -> Result<(), ReviewError> {
        let effect = GitHubEffect::PostComment {
            repo: issue.repo().clone(),
            pr: issue.number,
            body,
        };
        self.call(effect, || format!("Failed to comment on {}", issue))
            .await?;
        Ok(())
    }

    /// Checks that `user` may run a command on `issue`.
    ///
    /// Returns the response to send instead of running the command if they
    /// may not.
    pub(super) async fn authorize(
        &self,
        issue: &Issue,
        user: &str,
    ) -> Result<Option<Response>, ReviewError> {
        let effect = GitHubEffect::IsCollaborator {
            repo: issue.repo().clone(),
            user: user.to_string(),
        };
        match self
            .call(effect, || {
                format!("Failed to check whether {} is a collaborator on {}", user, issue.repo())
            })
            .await?
        {
            GitHubResponse::Collaborator(true) => Ok(None),
            GitHubResponse::Collaborator(false) => {
                info!(issue = %issue, user, "Refusing a command from a non-collaborator");
                self.post_comment(
                    issue,
                    format!(
                        "@{} Only collaborators of {} can squash or merge PRs.",
                        user,
                        issue.repo()
                    ),
                )
                .await?;
                Ok(Some(Response::success(format!(
                    "{} is not a collaborator on {}. Ignoring.",
                    user,
                    issue.repo()
                ))))
            }
            _ => Err(ReviewError::UnexpectedResponse {
                context: format!("Checking collaborator {}", user),
            }),
        }
    }
}
