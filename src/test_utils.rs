//! Shared test utilities: scripted interpreters, fixtures and generators.

use std::sync::Mutex;
use std::time::Duration;

use proptest::prelude::*;

use crate::effects::{
    BranchData, CommitData, GitEffect, GitHubEffect, GitHubInterpreter, GitHubResponse,
    GitInterpreter, GitResponse, Page, PrData,
};
use crate::git::GitError;
use crate::github::GitHubApiError;
use crate::retry::RetryScheduler;
use crate::review::ReviewEngine;
use crate::types::{Issue, PrNumber, Repository, Sha};
use crate::webhooks::{CommentAction, IssueComment};

// ─── Generators ───────────────────────────────────────────────────────────────

pub fn arb_sha() -> impl Strategy<Value = Sha> {
    "[0-9a-f]{40}".prop_map(|s| Sha::parse(s).unwrap())
}

// ─── Fixtures ─────────────────────────────────────────────────────────────────

/// A deterministic SHA derived from `n`.
pub fn sha(n: u64) -> Sha {
    Sha::parse(format!("{:040x}", n)).unwrap()
}

pub fn commit(id: u64, parents: &[u64], message: &str) -> CommitData {
    CommitData {
        sha: sha(id),
        parents: parents.iter().copied().map(sha).collect(),
        message: message.to_string(),
    }
}

pub fn widgets() -> Repository {
    Repository::new("acme", "widgets", "git@github.com:acme/widgets.git")
}

/// acme/widgets#42, opened by `author`.
pub fn test_issue() -> Issue {
    Issue {
        number: PrNumber(42),
        repository: widgets(),
        author: "author".to_string(),
    }
}

/// A newly created comment by `reviewer` on [`test_issue`].
pub fn test_comment(body: &str) -> IssueComment {
    IssueComment {
        action: CommentAction::Created,
        issue: test_issue(),
        is_pull_request: true,
        body: body.to_string(),
        commenter: "reviewer".to_string(),
    }
}

/// An open, mergeable PR with head `feature` at commit 2 and base `main`,
/// both in acme/widgets.
pub fn pr_data() -> PrData {
    PrData {
        number: PrNumber(42),
        author: "author".to_string(),
        merged: false,
        mergeable: Some(true),
        head: BranchData {
            ref_name: "feature".to_string(),
            sha: sha(2),
            repository: widgets(),
        },
        base: BranchData {
            ref_name: "main".to_string(),
            sha: sha(100),
            repository: widgets(),
        },
    }
}

/// The commit listing of [`pr_data`]; commit 2 is a fixup if `fixup`.
pub fn commits_page(fixup: bool) -> GitHubResponse {
    let second = if fixup { "fixup! Add widget" } else { "Polish widget" };
    GitHubResponse::Commits(Page {
        items: vec![commit(1, &[], "Add widget"), commit(2, &[1], second)],
        has_next_page: false,
    })
}

pub fn squash_conflict() -> GitError {
    GitError::SquashConflict {
        branch: "feature".to_string(),
        source: Box::new(GitError::CommandFailed {
            command: "git rebase --interactive --autosquash".to_string(),
            output: "CONFLICT (content): Merge conflict in src/lib.rs".to_string(),
        }),
    }
}

/// An engine over the mocks, with one try per entry of `delays` (seconds).
pub fn engine(github: MockGitHub, git: MockGit, delays: &[u64]) -> ReviewEngine<MockGitHub, MockGit> {
    ReviewEngine::new(
        github,
        git,
        RetryScheduler::new(),
        delays.iter().copied().map(Duration::from_secs).collect(),
    )
}

// ─── Mock interpreters ────────────────────────────────────────────────────────

type GitHubScript = Box<dyn FnMut(&GitHubEffect) -> Result<GitHubResponse, GitHubApiError> + Send>;

/// A GitHub interpreter that answers from a script and records every effect.
pub struct MockGitHub {
    effects: Mutex<Vec<GitHubEffect>>,
    script: Mutex<GitHubScript>,
}

impl MockGitHub {
    pub fn new(
        script: impl FnMut(&GitHubEffect) -> Result<GitHubResponse, GitHubApiError> + Send + 'static,
    ) -> Self {
        MockGitHub {
            effects: Mutex::new(Vec::new()),
            script: Mutex::new(Box::new(script)),
        }
    }

    /// Every effect interpreted so far, in order.
    pub fn effects(&self) -> Vec<GitHubEffect> {
        self.effects.lock().unwrap().clone()
    }
}

impl GitHubInterpreter for MockGitHub {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
        self.effects.lock().unwrap().push(effect.clone());
        let mut script = self.script.lock().unwrap();
        (*script)(&effect)
    }
}

enum GitScript {
    Push(Sha),
    Fail(fn() -> GitError),
    DeleteOnly,
}

/// A git interpreter with a fixed outcome that records every effect.
pub struct MockGit {
    effects: Mutex<Vec<GitEffect>>,
    script: GitScript,
}

impl MockGit {
    fn scripted(script: GitScript) -> Self {
        MockGit {
            effects: Mutex::new(Vec::new()),
            script,
        }
    }

    /// Squashes succeed with `head` as the pushed commit; deletes succeed.
    pub fn pushing(head: Sha) -> Self {
        Self::scripted(GitScript::Push(head))
    }

    /// Every effect fails with `error()`.
    pub fn failing(error: fn() -> GitError) -> Self {
        Self::scripted(GitScript::Fail(error))
    }

    /// Deletes succeed; squashing is not expected.
    pub fn deleting() -> Self {
        Self::scripted(GitScript::DeleteOnly)
    }

    pub fn effects(&self) -> Vec<GitEffect> {
        self.effects.lock().unwrap().clone()
    }
}

impl GitInterpreter for MockGit {
    type Error = GitError;

    async fn interpret(&self, effect: GitEffect) -> Result<GitResponse, GitError> {
        self.effects.lock().unwrap().push(effect.clone());
        match (&self.script, effect) {
            (GitScript::Fail(error), _) => Err(error()),
            (_, GitEffect::DeleteRemoteBranch { .. }) => Ok(GitResponse::BranchDeleted),
            (GitScript::Push(head), GitEffect::AutosquashAndPush { .. }) => {
                Ok(GitResponse::Pushed { head: head.clone() })
            }
            (GitScript::DeleteOnly, effect) => panic!("unexpected git effect {effect:?}"),
        }
    }
}
