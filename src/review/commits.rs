//! Resolving a PR's commits from GitHub's paginated listing.
//!
//! The listing is read right after pushes, when GitHub may still serve a
//! 404 or the previous history. Both show up here as retryable errors; the
//! caller decides how long to keep trying.

use std::collections::HashSet;

use tracing::debug;

use crate::effects::{CommitData, GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::github::GitHubApiError;
use crate::types::{Issue, Sha};

use super::ReviewError;

/// Which head the commit listing has to end at to be current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedHead {
    /// Any head is current. Used when no event says what was pushed.
    Any,
    /// The head the triggering event reported.
    Sha(Sha),
}

impl ExpectedHead {
    pub fn matches(&self, head: &Sha) -> bool {
        match self {
            ExpectedHead::Any => true,
            ExpectedHead::Sha(expected) => expected == head,
        }
    }
}

/// Why a set of commits has no single head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadError {
    Empty,
    Ambiguous(usize),
}

/// Returns the commit that is not a parent of any other commit in the set.
pub fn topological_head(commits: &[CommitData]) -> Result<&CommitData, HeadError> {
    let parents: HashSet<&Sha> = commits.iter().flat_map(|c| &c.parents).collect();
    let mut heads = commits.iter().filter(|c| !parents.contains(&c.sha));

    match (heads.next(), heads.next()) {
        (None, _) => Err(HeadError::Empty),
        (Some(head), None) => Ok(head),
        (Some(_), Some(_)) => Err(HeadError::Ambiguous(2 + heads.count())),
    }
}

/// Returns true if any commit message starts with `fixup! ` or `squash! `.
pub fn includes_fixup_commits(commits: &[CommitData]) -> bool {
    commits
        .iter()
        .any(|c| c.message.starts_with("fixup! ") || c.message.starts_with("squash! "))
}

/// Lists every commit of `issue`, checking that the listing is current.
///
/// # Errors
///
/// - [`ReviewError::CommitsNotListed`] (retryable) on a 404.
/// - [`ReviewError::StaleHead`] (retryable) if the listing does not end at
///   the expected head.
/// - [`ReviewError::AmbiguousHead`] if the listing has no single head.
/// - [`ReviewError::GitHub`] for any other API failure.
pub async fn get_commits<H>(
    github: &H,
    issue: &Issue,
    expected: &ExpectedHead,
) -> Result<Vec<CommitData>, ReviewError>
where
    H: GitHubInterpreter<Error = GitHubApiError>,
{
    let mut commits = Vec::new();
    let mut page = 1;

    loop {
        let effect = GitHubEffect::ListCommits {
            repo: issue.repo().clone(),
            pr: issue.number,
            page,
        };
        match github.interpret(effect).await {
            Ok(GitHubResponse::Commits(listing)) => {
                commits.extend(listing.items);
                if !listing.has_next_page {
                    break;
                }
                page += 1;
            }
            Ok(_) => {
                return Err(ReviewError::UnexpectedResponse {
                    context: format!("Listing commits for {}", issue),
                });
            }
            Err(source) if source.is_not_found() => {
                return Err(ReviewError::CommitsNotListed {
                    issue: issue.full_name(),
                    source,
                });
            }
            Err(source) => {
                return Err(ReviewError::GitHub {
                    context: format!("Failed to list commits for {}", issue),
                    source,
                });
            }
        }
    }

    let head = topological_head(&commits).map_err(|err| ReviewError::AmbiguousHead {
        issue: issue.full_name(),
        count: match err {
            HeadError::Empty => 0,
            HeadError::Ambiguous(count) => count,
        },
    })?;

    if !expected.matches(&head.sha) {
        return Err(ReviewError::StaleHead {
            issue: issue.full_name(),
            head: head.sha.clone(),
        });
    }

    debug!(issue = %issue, commits = commits.len(), head = %head.sha.short(), "Listed commits");
    Ok(commits)
}
