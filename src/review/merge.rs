//! The merge workflow: `!merge` and merges triggered by green CI.
//!
//! The `merging` label is the only record that a merge was requested. It is
//! added before the first merge attempt and removed once the PR is merged
//! or the merge definitely failed, so a status event after a restart still
//! finds every PR that is waiting to be merged.

use tracing::{info, warn};

use crate::effects::{
    ContextStatus, GitEffect, GitHubEffect, GitHubInterpreter, GitHubResponse, GitInterpreter,
    IssueData, PrData,
};
use crate::git::GitError;
use crate::github::GitHubApiError;
use crate::response::Response;
use crate::retry::{Attempt, Eventual, TryInfo};
use crate::types::{Issue, Repository, Sha, StatusState};
use crate::webhooks::{IssueComment, StatusEvent};

use super::engine::{attempt, settle};
use super::{MERGING_LABEL, ReviewEngine, ReviewError, SQUASH_CONTEXT};

/// The final combined status of a commit.
#[derive(Debug)]
struct CombinedStatus {
    /// Aggregate state reported with the last page.
    state: StatusState,
    statuses: Vec<ContextStatus>,
}

impl CombinedStatus {
    fn squash_pending(&self) -> bool {
        self.statuses
            .iter()
            .any(|s| s.context == SQUASH_CONTEXT && s.state == StatusState::Pending)
    }
}

/// Search query for open PRs labelled for merging whose head is `sha`.
pub fn merge_candidates_query(sha: &Sha, repository: &Repository) -> String {
    format!(
        "{} label:\"{}\" is:open repo:{} status:success",
        sha, MERGING_LABEL, repository.id
    )
}

impl<H, G> ReviewEngine<H, G>
where
    H: GitHubInterpreter<Error = GitHubApiError> + Send + Sync + 'static,
    G: GitInterpreter<Error = GitError> + Send + Sync + 'static,
{
    /// Handles `!merge`: claims the PR with the `merging` label and merges
    /// it if it is ready.
    ///
    /// Requires the commenter to be a collaborator. A PR that is not ready
    /// yet keeps its label and is merged by a later status event.
    pub async fn handle_merge_command(&self, comment: &IssueComment) -> Response {
        let issue = &comment.issue;
        match self.authorize(issue, &comment.commenter).await {
            Ok(None) => {}
            Ok(Some(refusal)) => return refusal,
            Err(err) => return err.into(),
        }
        if let Err(err) = self.add_merging_label(issue).await {
            return err.into();
        }

        settle(self.merge_with_retries(issue).await, || {
            format!("Continuing merging PR {} asynchronously.", issue.full_name())
        })
    }

    /// Merges every labelled PR whose head just got a successful status.
    pub async fn handle_status_event(&self, event: &StatusEvent) -> Response {
        if event.state != StatusState::Success {
            return Response::success(format!(
                "Status '{}' is {}. Ignoring.",
                event.context, event.state
            ));
        }
        if !event.is_branch_head() {
            return Response::success(format!(
                "{} is not the head of any branch. Ignoring.",
                event.sha.short()
            ));
        }

        let query = merge_candidates_query(&event.sha, &event.repository);
        info!(query = %query, "Searching for PRs to merge");
        let engine = self.clone();
        let repository = event.repository.clone();
        let result = self
            .run_with_retries(move |_| {
                let engine = engine.clone();
                let repository = repository.clone();
                let query = query.clone();
                async move { engine.merge_candidates_once(&repository, &query).await }
            })
            .await;

        settle(result, || {
            format!(
                "Continuing searching for PRs to merge at {} asynchronously.",
                event.sha.short()
            )
        })
    }

    /// Runs the merge of one PR on the engine's try schedule.
    pub async fn merge_with_retries(&self, issue: &Issue) -> Result<Eventual<Response>, ReviewError> {
        let engine = self.clone();
        let issue = issue.clone();
        self.run_with_retries(move |try_info| {
            let engine = engine.clone();
            let issue = issue.clone();
            async move { attempt(engine.merge_once(&issue, try_info).await) }
        })
        .await
    }

    async fn merge_candidates_once(&self, repository: &Repository, query: &str) -> Attempt<Response> {
        let found = match self.search_issues(query).await {
            Ok(found) => found,
            Err(err) => return Attempt::done(err.into()),
        };
        if found.is_empty() {
            // The search index lags behind status updates.
            return Attempt::retry(Response::success("No PRs found to merge."));
        }

        let count = found.len();
        let mut last_failure: Option<Response> = None;
        for candidate in found {
            let issue = Issue {
                number: candidate.number,
                repository: repository.clone(),
                author: candidate.author,
            };
            let response = match self.merge_with_retries(&issue).await {
                Ok(Eventual::Completed(response)) => response,
                Ok(Eventual::InProgress(_)) => continue,
                Err(err) => err.into(),
            };
            if !response.is_success() {
                if let Some(earlier) = last_failure.replace(response) {
                    earlier.log("Merging one of several PRs failed");
                }
            }
        }

        Attempt::done(last_failure.unwrap_or_else(|| {
            Response::success(format!("Processed {} PR(s) ready for merging.", count))
        }))
    }

    async fn search_issues(&self, query: &str) -> Result<Vec<IssueData>, ReviewError> {
        let mut found = Vec::new();
        let mut page = 1;
        loop {
            let effect = GitHubEffect::SearchIssues {
                query: query.to_string(),
                page,
            };
            match self.interpret_github(effect).await {
                Ok(GitHubResponse::Issues(results)) => {
                    found.extend(results.items);
                    if !results.has_next_page {
                        return Ok(found);
                    }
                    page += 1;
                }
                Ok(_) => {
                    return Err(ReviewError::UnexpectedResponse {
                        context: "Searching for PRs to merge".to_string(),
                    });
                }
                Err(source) => {
                    return Err(ReviewError::GitHub {
                        context: "Failed to search for PRs to merge".to_string(),
                        source,
                    });
                }
            }
        }
    }

    async fn combined_status(&self, pr: &PrData, issue: &Issue) -> Result<CombinedStatus, ReviewError> {
        let mut statuses = Vec::new();
        let mut page = 1;
        loop {
            let effect = GitHubEffect::GetCombinedStatus {
                repo: issue.repo().clone(),
                reference: pr.head.sha.to_string(),
                page,
            };
            match self.interpret_github(effect).await {
                Ok(GitHubResponse::CombinedStatus(combined)) => {
                    statuses.extend(combined.statuses);
                    if !combined.has_next_page {
                        return Ok(CombinedStatus {
                            state: combined.state,
                            statuses,
                        });
                    }
                    page += 1;
                }
                Ok(_) => {
                    return Err(ReviewError::UnexpectedResponse {
                        context: format!("Getting the combined status of {}", issue),
                    });
                }
                Err(source) => {
                    return Err(ReviewError::GitHub {
                        context: format!("Failed to get the combined status of {}", issue),
                        source,
                    });
                }
            }
        }
    }

    /// One try at merging a labelled PR.
    async fn merge_once(&self, issue: &Issue, try_info: TryInfo) -> Result<Response, ReviewError> {
        let pr = self.get_pr(issue).await?;
        if pr.merged {
            info!(issue = %issue, "Already merged; removing the label");
            self.remove_merging_label(issue).await?;
            return Ok(Response::success(format!("{} is already merged.", issue)));
        }
        if pr.mergeable != Some(true) {
            return Ok(Response::success(format!(
                "{} is not mergeable. Leaving it labelled.",
                issue
            )));
        }

        let status = self.combined_status(&pr, issue).await?;
        if status.state == StatusState::Pending && status.squash_pending() {
            info!(issue = %issue, "Squash status is pending; squashing instead of merging");
            return self.squash_and_report(&pr).await;
        }
        if status.state != StatusState::Success {
            return Ok(Response::success(format!(
                "Combined status of {} is {}. Leaving it labelled.",
                issue, status.state
            )));
        }

        let effect = GitHubEffect::Merge {
            repo: issue.repo().clone(),
            pr: issue.number,
        };
        match self.interpret_github(effect).await {
            Ok(GitHubResponse::Merge { merged: true, .. }) => self.finish_merge(issue, &pr).await,
            Ok(GitHubResponse::Merge { merged: false, message }) => Err(ReviewError::NotMerged {
                issue: issue.full_name(),
                message: message.unwrap_or_default(),
            }),
            Ok(_) => Err(ReviewError::UnexpectedResponse {
                context: format!("Merging {}", issue),
            }),
            Err(source) if source.is_head_modified() => {
                if try_info.is_last() {
                    warn!(issue = %issue, tries = try_info.number, "Head kept changing; giving up");
                    self.report_conflict(issue, &pr, &source).await?;
                } else {
                    info!(issue = %issue, try_number = try_info.number, "Head was modified; trying again");
                }
                Err(ReviewError::HeadModified {
                    issue: issue.full_name(),
                    source,
                })
            }
            Err(source) if source.is_conflict() => {
                self.report_conflict(issue, &pr, &source).await?;
                Ok(Response::success(format!(
                    "Merging {} failed with a conflict. Notified {}.",
                    issue, pr.author
                )))
            }
            Err(source) if source.is_method_not_allowed() => Err(ReviewError::GitHub {
                context: format!("{} is not mergeable", issue),
                source,
            }),
            Err(source) => Err(ReviewError::GitHub {
                context: format!("Failed to merge {}", issue),
                source,
            }),
        }
    }

    async fn finish_merge(&self, issue: &Issue, pr: &PrData) -> Result<Response, ReviewError> {
        info!(issue = %issue, "Merged");
        self.remove_merging_label(issue).await?;

        if pr.is_cross_fork() {
            return Ok(Response::success(format!(
                "Merged {}. Leaving the head branch in {}.",
                issue, pr.head.repository
            )));
        }

        let effect = GitEffect::DeleteRemoteBranch {
            repo: pr.head.repository.clone(),
            branch: pr.head.ref_name.clone(),
        };
        self.interpret_git(effect)
            .await
            .map_err(|source| ReviewError::Git {
                context: format!("Failed to delete branch {} after merging", pr.head.ref_name),
                source,
            })?;
        Ok(Response::success(format!(
            "Merged {} and deleted {}.",
            issue, pr.head.ref_name
        )))
    }

    /// Gives up on merging: removes the label and tells the author.
    ///
    /// The comment is posted even if removing the label fails; the label
    /// failure is the one reported.
    async fn report_conflict(
        &self,
        issue: &Issue,
        pr: &PrData,
        cause: &GitHubApiError,
    ) -> Result<(), ReviewError> {
        let removed = self.remove_merging_label(issue).await;
        let posted = self
            .post_comment(
                issue,
                format!(
                    "@{} Failed to merge this PR: {}. Please resolve it and comment `!merge` again.",
                    pr.author, cause.message
                ),
            )
            .await;
        removed?;
        posted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{CombinedStatusPage, Page};
    use crate::test_utils::{
        MockGit, MockGitHub, arb_sha, engine, pr_data, sha, test_comment, test_issue,
    };
    use proptest::prelude::*;
    use crate::types::PrNumber;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn combined(state: StatusState, squash: StatusState) -> GitHubResponse {
        GitHubResponse::CombinedStatus(CombinedStatusPage {
            state,
            statuses: vec![
                ContextStatus {
                    context: "ci/build".to_string(),
                    state: StatusState::Success,
                },
                ContextStatus {
                    context: SQUASH_CONTEXT.to_string(),
                    state: squash,
                },
            ],
            has_next_page: false,
        })
    }

    fn head_modified() -> GitHubApiError {
        GitHubApiError::from_status(409, "Head branch was modified. Review and try the merge again.")
    }

    /// A ready PR whose merge call answers with `merge`.
    fn ready_pr(
        mut merge: impl FnMut() -> Result<GitHubResponse, GitHubApiError> + Send + 'static,
    ) -> MockGitHub {
        MockGitHub::new(move |effect| match effect {
            GitHubEffect::IsCollaborator { .. } => Ok(GitHubResponse::Collaborator(true)),
            GitHubEffect::AddLabel { .. } => Ok(GitHubResponse::LabelAdded),
            GitHubEffect::RemoveLabel { .. } => Ok(GitHubResponse::LabelRemoved),
            GitHubEffect::PostComment { .. } => Ok(GitHubResponse::CommentPosted),
            GitHubEffect::GetPr { .. } => Ok(GitHubResponse::Pr(pr_data())),
            GitHubEffect::GetCombinedStatus { .. } => {
                Ok(combined(StatusState::Success, StatusState::Success))
            }
            GitHubEffect::Merge { .. } => merge(),
            other => panic!("unexpected effect {other:?}"),
        })
    }

    fn merged() -> Result<GitHubResponse, GitHubApiError> {
        Ok(GitHubResponse::Merge {
            merged: true,
            message: Some("Pull Request successfully merged".to_string()),
        })
    }

    fn count(github: &MockGitHub, pred: impl Fn(&GitHubEffect) -> bool) -> usize {
        github.effects().iter().filter(|e| pred(e)).count()
    }

    async fn final_response(eventual: Eventual<Response>) -> Response {
        match eventual {
            Eventual::Completed(response) => response,
            Eventual::InProgress(handle) => handle.await.unwrap(),
        }
    }

    // ─── !merge ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn merge_command_labels_merges_and_deletes_branch() {
        let engine = engine(ready_pr(merged), MockGit::deleting(), &[0]);

        let response = engine.handle_merge_command(&test_comment("!merge")).await;

        assert!(response.is_success(), "{response:?}");
        let effects = engine.github().effects();
        assert!(matches!(effects[0], GitHubEffect::IsCollaborator { .. }));
        assert!(matches!(effects[1], GitHubEffect::AddLabel { ref label, .. } if label == "merging"));
        assert!(matches!(effects.last(), Some(GitHubEffect::RemoveLabel { .. })));
        assert_eq!(
            engine.git().effects(),
            vec![GitEffect::DeleteRemoteBranch {
                repo: pr_data().head.repository,
                branch: "feature".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn cross_fork_head_branch_is_kept() {
        let github = MockGitHub::new(|effect| match effect {
            GitHubEffect::GetPr { .. } => {
                let mut pr = pr_data();
                pr.head.repository = Repository::new("fork", "widgets", "git@github.com:fork/widgets.git");
                Ok(GitHubResponse::Pr(pr))
            }
            GitHubEffect::GetCombinedStatus { .. } => {
                Ok(combined(StatusState::Success, StatusState::Success))
            }
            GitHubEffect::Merge { .. } => merged(),
            _ => Ok(GitHubResponse::LabelRemoved),
        });
        let engine = engine(github, MockGit::deleting(), &[0]);

        let response = final_response(engine.merge_with_retries(&test_issue()).await.unwrap()).await;

        assert!(response.is_success(), "{response:?}");
        assert!(engine.git().effects().is_empty());
    }

    #[tokio::test]
    async fn label_failure_is_a_gateway_error() {
        let github = MockGitHub::new(|effect| match effect {
            GitHubEffect::IsCollaborator { .. } => Ok(GitHubResponse::Collaborator(true)),
            GitHubEffect::AddLabel { .. } => Err(GitHubApiError::from_status(500, "Server Error")),
            other => panic!("unexpected effect {other:?}"),
        });
        let engine = engine(github, MockGit::deleting(), &[0]);

        let response = engine.handle_merge_command(&test_comment("!merge")).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn already_merged_pr_loses_its_label() {
        let github = MockGitHub::new(|effect| match effect {
            GitHubEffect::GetPr { .. } => {
                let mut pr = pr_data();
                pr.merged = true;
                Ok(GitHubResponse::Pr(pr))
            }
            GitHubEffect::RemoveLabel { .. } => Ok(GitHubResponse::LabelRemoved),
            other => panic!("unexpected effect {other:?}"),
        });
        let engine = engine(github, MockGit::deleting(), &[0]);

        let response = final_response(engine.merge_with_retries(&test_issue()).await.unwrap()).await;

        assert!(response.is_success());
        assert_eq!(count(engine.github(), |e| matches!(e, GitHubEffect::RemoveLabel { .. })), 1);
    }

    #[tokio::test]
    async fn unmergeable_or_red_pr_keeps_its_label() {
        for (mergeable, state) in [
            (Some(false), StatusState::Success),
            (None, StatusState::Success),
            (Some(true), StatusState::Failure),
            (Some(true), StatusState::Pending),
        ] {
            let github = MockGitHub::new(move |effect| match effect {
                GitHubEffect::GetPr { .. } => {
                    let mut pr = pr_data();
                    pr.mergeable = mergeable;
                    Ok(GitHubResponse::Pr(pr))
                }
                GitHubEffect::GetCombinedStatus { .. } => Ok(combined(state, StatusState::Success)),
                other => panic!("unexpected effect {other:?}"),
            });
            let engine = engine(github, MockGit::deleting(), &[0]);

            let response =
                final_response(engine.merge_with_retries(&test_issue()).await.unwrap()).await;

            assert!(response.is_success(), "{mergeable:?} {state}: {response:?}");
            assert_eq!(
                count(engine.github(), |e| matches!(
                    e,
                    GitHubEffect::RemoveLabel { .. } | GitHubEffect::Merge { .. }
                )),
                0
            );
        }
    }

    #[tokio::test]
    async fn combined_status_uses_the_last_page_state() {
        let github = MockGitHub::new(|effect| match effect {
            GitHubEffect::GetPr { .. } => Ok(GitHubResponse::Pr(pr_data())),
            GitHubEffect::GetCombinedStatus { page: 1, .. } => {
                Ok(GitHubResponse::CombinedStatus(CombinedStatusPage {
                    state: StatusState::Pending,
                    statuses: vec![],
                    has_next_page: true,
                }))
            }
            GitHubEffect::GetCombinedStatus { .. } => {
                Ok(combined(StatusState::Success, StatusState::Success))
            }
            GitHubEffect::Merge { .. } => merged(),
            _ => Ok(GitHubResponse::LabelRemoved),
        });
        let engine = engine(github, MockGit::deleting(), &[0]);

        let response = final_response(engine.merge_with_retries(&test_issue()).await.unwrap()).await;

        assert!(response.is_success(), "{response:?}");
        assert_eq!(count(engine.github(), |e| matches!(e, GitHubEffect::Merge { .. })), 1);
    }

    #[tokio::test]
    async fn pending_squash_status_squashes_instead_of_merging() {
        let github = MockGitHub::new(|effect| match effect {
            GitHubEffect::IsCollaborator { .. } => Ok(GitHubResponse::Collaborator(true)),
            GitHubEffect::AddLabel { .. } => Ok(GitHubResponse::LabelAdded),
            GitHubEffect::GetPr { .. } => Ok(GitHubResponse::Pr(pr_data())),
            GitHubEffect::GetCombinedStatus { .. } => {
                Ok(combined(StatusState::Pending, StatusState::Pending))
            }
            GitHubEffect::CreateStatus { .. } => Ok(GitHubResponse::StatusCreated),
            other => panic!("unexpected effect {other:?}"),
        });
        let engine = engine(github, MockGit::pushing(sha(3)), &[0]);

        let response = engine.handle_merge_command(&test_comment("!merge")).await;

        assert!(response.is_success(), "{response:?}");
        assert!(matches!(
            engine.git().effects()[..],
            [GitEffect::AutosquashAndPush { .. }]
        ));
        match engine.github().effects().last() {
            Some(GitHubEffect::CreateStatus { sha: head, status, .. }) => {
                assert_eq!(head, &sha(3));
                assert_eq!(status.context, "review/squash");
                assert_eq!(status.state, StatusState::Success);
            }
            other => panic!("expected a status, got {other:?}"),
        }
        assert_eq!(count(engine.github(), |e| matches!(e, GitHubEffect::Merge { .. })), 0);
    }

    #[tokio::test]
    async fn head_modified_then_merged_within_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let merges = calls.clone();
        let github = ready_pr(move || {
            if merges.fetch_add(1, Ordering::SeqCst) < 3 {
                Err(head_modified())
            } else {
                merged()
            }
        });
        let engine = engine(github, MockGit::deleting(), &[0, 0, 0, 0]);

        let response = final_response(engine.merge_with_retries(&test_issue()).await.unwrap()).await;

        assert!(response.is_success(), "{response:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let github = engine.github();
        assert_eq!(count(github, |e| matches!(e, GitHubEffect::GetPr { .. })), 4);
        assert_eq!(count(github, |e| matches!(e, GitHubEffect::RemoveLabel { .. })), 1);
        assert_eq!(count(github, |e| matches!(e, GitHubEffect::PostComment { .. })), 0);
    }

    #[tokio::test]
    async fn head_modified_until_budget_runs_out_notifies_author() {
        let engine = engine(ready_pr(|| Err(head_modified())), MockGit::deleting(), &[0, 0, 0]);

        let response = final_response(engine.merge_with_retries(&test_issue()).await.unwrap()).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let github = engine.github();
        assert_eq!(count(github, |e| matches!(e, GitHubEffect::Merge { .. })), 3);
        assert_eq!(count(github, |e| matches!(e, GitHubEffect::RemoveLabel { .. })), 1);
        let comments: Vec<String> = github
            .effects()
            .into_iter()
            .filter_map(|e| match e {
                GitHubEffect::PostComment { body, .. } => Some(body),
                _ => None,
            })
            .collect();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].contains("@author"), "{}", comments[0]);
        assert!(engine.git().effects().is_empty());
    }

    #[tokio::test]
    async fn other_conflicts_notify_without_retrying() {
        let engine = engine(
            ready_pr(|| Err(GitHubApiError::from_status(409, "Merge conflict"))),
            MockGit::deleting(),
            &[0, 0, 0],
        );

        let response = final_response(engine.merge_with_retries(&test_issue()).await.unwrap()).await;

        assert!(response.is_success(), "{response:?}");
        let github = engine.github();
        assert_eq!(count(github, |e| matches!(e, GitHubEffect::Merge { .. })), 1);
        assert_eq!(count(github, |e| matches!(e, GitHubEffect::PostComment { .. })), 1);
    }

    #[tokio::test]
    async fn conflict_with_failed_label_removal_still_comments() {
        let github = MockGitHub::new(|effect| match effect {
            GitHubEffect::GetPr { .. } => Ok(GitHubResponse::Pr(pr_data())),
            GitHubEffect::GetCombinedStatus { .. } => {
                Ok(combined(StatusState::Success, StatusState::Success))
            }
            GitHubEffect::Merge { .. } => Err(GitHubApiError::from_status(409, "Merge conflict")),
            GitHubEffect::RemoveLabel { .. } => Err(GitHubApiError::from_status(500, "Server Error")),
            GitHubEffect::PostComment { .. } => Ok(GitHubResponse::CommentPosted),
            other => panic!("unexpected effect {other:?}"),
        });
        let engine = engine(github, MockGit::deleting(), &[0]);

        let response = final_response(engine.merge_with_retries(&test_issue()).await.unwrap()).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.message().contains("remove the 'merging' label"), "{response:?}");
        assert_eq!(
            count(engine.github(), |e| matches!(e, GitHubEffect::PostComment { .. })),
            1
        );
    }

    #[tokio::test]
    async fn method_not_allowed_and_unmerged_are_gateway_errors() {
        let outcomes: [fn() -> Result<GitHubResponse, GitHubApiError>; 2] = [
            || Err(GitHubApiError::from_status(405, "Pull Request is not mergeable")),
            || {
                Ok(GitHubResponse::Merge {
                    merged: false,
                    message: Some("Base branch was modified".to_string()),
                })
            },
        ];
        for merge in outcomes {
            let engine = engine(ready_pr(merge), MockGit::deleting(), &[0]);
            let response =
                final_response(engine.merge_with_retries(&test_issue()).await.unwrap()).await;
            assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
            assert_eq!(
                count(engine.github(), |e| matches!(e, GitHubEffect::RemoveLabel { .. })),
                0
            );
        }
    }

    // ─── status events ────────────────────────────────────────────────────────

    fn status_event(state: StatusState, branch_heads: Vec<Sha>) -> StatusEvent {
        StatusEvent {
            sha: sha(2),
            state,
            context: "ci/build".to_string(),
            branch_heads,
            repository: test_issue().repository,
        }
    }

    #[test]
    fn candidates_query_names_sha_label_and_repo() {
        assert_eq!(
            merge_candidates_query(&sha(2), &test_issue().repository),
            format!(
                "{} label:\"merging\" is:open repo:acme/widgets status:success",
                sha(2)
            )
        );
    }

    proptest! {
        #[test]
        fn candidates_query_leads_with_the_sha(head in arb_sha()) {
            let query = merge_candidates_query(&head, &test_issue().repository);
            prop_assert!(query.starts_with(head.as_str()));
            prop_assert!(query.ends_with(" status:success"));
        }
    }

    #[tokio::test]
    async fn status_for_non_head_sha_is_a_no_op() {
        let engine = engine(ready_pr(merged), MockGit::deleting(), &[0]);

        let response = engine
            .handle_status_event(&status_event(StatusState::Success, vec![sha(9)]))
            .await;

        assert!(response.is_success());
        assert!(engine.github().effects().is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_a_no_op() {
        let engine = engine(ready_pr(merged), MockGit::deleting(), &[0]);

        let response = engine
            .handle_status_event(&status_event(StatusState::Pending, vec![sha(2)]))
            .await;

        assert!(response.is_success());
        assert!(engine.github().effects().is_empty());
    }

    #[tokio::test]
    async fn batch_attempts_every_pr_and_reports_the_last_failure() {
        let github = MockGitHub::new(|effect| match effect {
            GitHubEffect::SearchIssues { .. } => Ok(GitHubResponse::Issues(Page {
                items: vec![
                    IssueData {
                        number: PrNumber(42),
                        author: "author".to_string(),
                    },
                    IssueData {
                        number: PrNumber(43),
                        author: "other".to_string(),
                    },
                ],
                has_next_page: false,
            })),
            GitHubEffect::GetPr { pr: PrNumber(43), .. } => {
                Err(GitHubApiError::from_status(502, "Bad Gateway"))
            }
            GitHubEffect::GetPr { .. } => Ok(GitHubResponse::Pr(pr_data())),
            GitHubEffect::GetCombinedStatus { .. } => {
                Ok(combined(StatusState::Success, StatusState::Success))
            }
            GitHubEffect::Merge { .. } => merged(),
            GitHubEffect::RemoveLabel { .. } => Ok(GitHubResponse::LabelRemoved),
            other => panic!("unexpected effect {other:?}"),
        });
        let engine = engine(github, MockGit::deleting(), &[0]);

        let response = engine
            .handle_status_event(&status_event(StatusState::Success, vec![sha(7), sha(2)]))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.message().contains("#43"), "{response:?}");
        let github = engine.github();
        assert_eq!(count(github, |e| matches!(e, GitHubEffect::GetPr { .. })), 2);
        assert_eq!(
            github
                .effects()
                .iter()
                .filter(|e| matches!(e, GitHubEffect::RemoveLabel { pr: PrNumber(42), .. }))
                .count(),
            1
        );
        assert_eq!(count(github, |e| matches!(e, GitHubEffect::AddLabel { .. })), 0);
        assert_eq!(count(github, |e| matches!(e, GitHubEffect::IsCollaborator { .. })), 0);
    }

    #[tokio::test]
    async fn search_failure_is_a_gateway_error_without_retry() {
        let github = MockGitHub::new(|_| Err(GitHubApiError::from_status(500, "Server Error")));
        let engine = engine(github, MockGit::deleting(), &[0, 0]);

        let response = engine
            .handle_status_event(&status_event(StatusState::Success, vec![sha(2)]))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(engine.github().effects().len(), 1);
    }

    #[tokio::test]
    async fn empty_search_is_retried_until_tries_run_out() {
        let github = MockGitHub::new(|_| {
            Ok(GitHubResponse::Issues(Page {
                items: vec![],
                has_next_page: false,
            }))
        });
        let engine = engine(github, MockGit::deleting(), &[0, 0, 0]);

        let response = engine
            .handle_status_event(&status_event(StatusState::Success, vec![sha(2)]))
            .await;
        assert!(response.message().starts_with("Continuing searching"), "{response:?}");

        engine.scheduler().drain().await;
        assert_eq!(engine.github().effects().len(), 3);
    }
}
