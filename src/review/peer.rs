//! Marking PRs as peer reviewed.

use tracing::info;

use crate::effects::{GitHubInterpreter, GitInterpreter};
use crate::git::GitError;
use crate::github::GitHubApiError;
use crate::response::Response;
use crate::types::StatusState;
use crate::webhooks::IssueComment;

use super::{PEER_REVIEW_CONTEXT, PEER_REVIEW_DESCRIPTION, ReviewEngine};

impl<H, G> ReviewEngine<H, G>
where
    H: GitHubInterpreter<Error = GitHubApiError> + Send + Sync + 'static,
    G: GitInterpreter<Error = GitError> + Send + Sync + 'static,
{
    /// Handles a `+1` comment: sets a successful peer review status on the
    /// PR's head commit.
    pub async fn handle_plus_one(&self, comment: &IssueComment) -> Response {
        info!(issue = %comment.issue, reviewer = %comment.commenter, "Marking PR as peer reviewed");
        let pr = match self.get_pr(&comment.issue).await {
            Ok(pr) => pr,
            Err(err) => return err.into(),
        };
        match self
            .set_status(
                &pr.head.repository.id,
                &pr.head.sha,
                PEER_REVIEW_CONTEXT,
                StatusState::Success,
                PEER_REVIEW_DESCRIPTION,
            )
            .await
        {
            Ok(()) => Response::success(format!("Marked {} as peer reviewed", comment.issue)),
            Err(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{GitHubEffect, GitHubResponse};
    use crate::test_utils::{MockGit, MockGitHub, engine, pr_data, sha, test_comment};
    use crate::types::Repository;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn plus_one_marks_the_head_in_the_head_repository() {
        let mut pr = pr_data();
        pr.head.repository = Repository::new("fork", "widgets", "git@github.com:fork/widgets.git");
        pr.head.sha = sha(7);
        let fork = pr.head.repository.id.clone();
        let github = MockGitHub::new(move |effect| match effect {
            GitHubEffect::GetPr { .. } => Ok(GitHubResponse::Pr(pr.clone())),
            GitHubEffect::CreateStatus { .. } => Ok(GitHubResponse::StatusCreated),
            other => panic!("unexpected effect {other:?}"),
        });
        let engine = engine(github, MockGit::deleting(), &[0]);

        let response = engine.handle_plus_one(&test_comment("Looking good! +1")).await;

        assert!(response.is_success(), "{response:?}");
        let effects = engine.github().effects();
        let GitHubEffect::CreateStatus { repo, sha: head, status } = &effects[1] else {
            panic!("expected a status, got {effects:?}");
        };
        assert_eq!(repo, &fork);
        assert_eq!(head, &sha(7));
        assert_eq!(status.context, "review/peer");
        assert_eq!(status.state, StatusState::Success);
        assert_eq!(status.description, PEER_REVIEW_DESCRIPTION);
        assert!(engine.git().effects().is_empty());
    }

    #[tokio::test]
    async fn failing_pr_lookup_is_a_gateway_error() {
        let github = MockGitHub::new(|effect| match effect {
            GitHubEffect::GetPr { .. } => Err(GitHubApiError::from_status(500, "Server Error")),
            other => panic!("unexpected effect {other:?}"),
        });
        let engine = engine(github, MockGit::deleting(), &[0]);

        let response = engine.handle_plus_one(&test_comment("+1")).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(engine.github().effects().len(), 1);
    }

    #[tokio::test]
    async fn failing_status_is_a_gateway_error() {
        let github = MockGitHub::new(|effect| match effect {
            GitHubEffect::GetPr { .. } => Ok(GitHubResponse::Pr(pr_data())),
            GitHubEffect::CreateStatus { .. } => Err(GitHubApiError::from_status(502, "Bad Gateway")),
            other => panic!("unexpected effect {other:?}"),
        });
        let engine = engine(github, MockGit::deleting(), &[0]);

        let response = engine.handle_plus_one(&test_comment(":+1:")).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
