//! Routing parsed events to the review workflows.

use tracing::{debug, info};

use crate::commands::{Command, is_plus_one, parse_command};
use crate::effects::{GitHubInterpreter, GitInterpreter};
use crate::git::GitError;
use crate::github::GitHubApiError;
use crate::response::Response;
use crate::review::ReviewEngine;

use super::events::{CommentAction, GitHubEvent, IssueComment};

/// Handles one parsed webhook event and returns the HTTP answer.
///
/// Comments are acted on only when they are newly created on a PR and
/// either start with a command keyword or give the PR a `+1`.
pub async fn dispatch<H, G>(engine: &ReviewEngine<H, G>, event: GitHubEvent) -> Response
where
    H: GitHubInterpreter<Error = GitHubApiError> + Send + Sync + 'static,
    G: GitInterpreter<Error = GitError> + Send + Sync + 'static,
{
    match event {
        GitHubEvent::IssueComment(comment) => dispatch_comment(engine, &comment).await,
        GitHubEvent::PullRequest(event) => engine.handle_pull_request_event(&event).await,
        GitHubEvent::Status(event) => engine.handle_status_event(&event).await,
    }
}

async fn dispatch_comment<H, G>(engine: &ReviewEngine<H, G>, comment: &IssueComment) -> Response
where
    H: GitHubInterpreter<Error = GitHubApiError> + Send + Sync + 'static,
    G: GitInterpreter<Error = GitError> + Send + Sync + 'static,
{
    if !comment.is_pull_request {
        return Response::success("Not a PR. Ignoring.");
    }
    if comment.action != CommentAction::Created {
        debug!(issue = %comment.issue, action = ?comment.action, "Ignoring comment action");
        return Response::success("Not a new comment. Ignoring.");
    }
    let Some(command) = parse_command(&comment.body) else {
        if is_plus_one(&comment.body) {
            return engine.handle_plus_one(comment).await;
        }
        return Response::success("Not a command I understand. Ignoring.");
    };

    info!(issue = %comment.issue, commenter = %comment.commenter, command = %command, "Received command");
    match command {
        Command::Squash => engine.handle_squash_command(comment).await,
        Command::Check => engine.handle_check_command(comment).await,
        Command::Merge => engine.handle_merge_command(comment).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{GitHubEffect, GitHubResponse};
    use crate::test_utils::{MockGit, MockGitHub, commits_page, engine, pr_data, sha, test_comment};
    use proptest::prelude::*;

    fn quiet_engine() -> ReviewEngine<MockGitHub, MockGit> {
        engine(
            MockGitHub::new(|effect| panic!("unexpected effect {effect:?}")),
            MockGit::deleting(),
            &[0],
        )
    }

    #[tokio::test]
    async fn comment_on_plain_issue_is_ignored() {
        let engine = quiet_engine();
        let mut comment = test_comment("!merge");
        comment.is_pull_request = false;

        let response = dispatch(&engine, GitHubEvent::IssueComment(comment)).await;

        assert_eq!(response, Response::success("Not a PR. Ignoring."));
    }

    #[tokio::test]
    async fn edited_and_deleted_comments_are_ignored() {
        let engine = quiet_engine();
        for action in [CommentAction::Edited, CommentAction::Deleted] {
            let mut comment = test_comment("!squash");
            comment.action = action;
            let response = dispatch(&engine, GitHubEvent::IssueComment(comment)).await;
            assert!(response.is_success());
        }
        assert!(engine.github().effects().is_empty());
    }

    #[tokio::test]
    async fn check_command_reaches_the_check_workflow() {
        let github = MockGitHub::new(|effect| match effect {
            GitHubEffect::ListCommits { .. } => Ok(commits_page(false)),
            GitHubEffect::GetPr { .. } => Ok(GitHubResponse::Pr(pr_data())),
            GitHubEffect::CreateStatus { .. } => Ok(GitHubResponse::StatusCreated),
            other => panic!("unexpected effect {other:?}"),
        });
        let engine = engine(github, MockGit::pushing(sha(3)), &[0]);

        let response = dispatch(&engine, GitHubEvent::IssueComment(test_comment("!check please"))).await;

        assert!(response.is_success(), "{response:?}");
        assert!(
            engine
                .github()
                .effects()
                .iter()
                .any(|e| matches!(e, GitHubEffect::CreateStatus { .. }))
        );
    }

    #[tokio::test]
    async fn plus_one_comments_mark_the_pr_peer_reviewed() {
        for body in [
            "+1, awesome job!",
            "Looking good! +1",
            "Good job! +1 PS: Don't forget to update that other thing.",
            "Good job! :+1:",
        ] {
            let github = MockGitHub::new(|effect| match effect {
                GitHubEffect::GetPr { .. } => Ok(GitHubResponse::Pr(pr_data())),
                GitHubEffect::CreateStatus { .. } => Ok(GitHubResponse::StatusCreated),
                other => panic!("unexpected effect {other:?}"),
            });
            let engine = engine(github, MockGit::deleting(), &[0]);

            let response = dispatch(&engine, GitHubEvent::IssueComment(test_comment(body))).await;

            assert!(response.is_success(), "{body}: {response:?}");
            assert!(
                engine.github().effects().iter().any(|e| matches!(
                    e,
                    GitHubEffect::CreateStatus { status, .. } if status.context == "review/peer"
                )),
                "{body}"
            );
        }
    }

    #[tokio::test]
    async fn plus_one_with_failing_github_is_a_gateway_error() {
        let github = MockGitHub::new(|_| Err(GitHubApiError::from_status(500, "Server Error")));
        let engine = engine(github, MockGit::deleting(), &[0]);

        let response = dispatch(&engine, GitHubEvent::IssueComment(test_comment("+1"))).await;

        assert_eq!(response.status(), axum::http::StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn plus_one_inside_a_number_is_ignored() {
        let engine = quiet_engine();

        let comment = test_comment("Wow +1832 -534 changes. Slow down!");
        let response = dispatch(&engine, GitHubEvent::IssueComment(comment)).await;

        assert_eq!(response, Response::success("Not a command I understand. Ignoring."));
    }

    #[tokio::test]
    async fn commands_take_precedence_over_plus_one() {
        let github = MockGitHub::new(|effect| match effect {
            GitHubEffect::ListCommits { .. } => Ok(commits_page(false)),
            GitHubEffect::GetPr { .. } => Ok(GitHubResponse::Pr(pr_data())),
            GitHubEffect::CreateStatus { .. } => Ok(GitHubResponse::StatusCreated),
            other => panic!("unexpected effect {other:?}"),
        });
        let engine = engine(github, MockGit::pushing(sha(3)), &[0]);

        let response = dispatch(&engine, GitHubEvent::IssueComment(test_comment("!check +1"))).await;

        assert!(response.is_success(), "{response:?}");
        assert!(engine.github().effects().iter().all(|e| !matches!(
            e,
            GitHubEffect::CreateStatus { status, .. } if status.context == "review/peer"
        )));
    }

    proptest! {
        #[test]
        fn non_commands_touch_nothing(body in "[a-z !]{0,30}") {
            prop_assume!(parse_command(&body).is_none());
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let engine = quiet_engine();
            let response = rt.block_on(dispatch(&engine, GitHubEvent::IssueComment(test_comment(&body))));
            prop_assert_eq!(response, Response::success("Not a command I understand. Ignoring."));
        }
    }
}
