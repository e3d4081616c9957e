//! Per-repository local clones with serialized access.
//!
//! [`RepoManager`] maps each repository to a [`RepoHandle`] for its local
//! path. The manager's own lock only guards that map, so unrelated
//! repositories are cloned, rebased and pushed fully in parallel. Each
//! handle carries an async mutex that serializes every git invocation
//! against its working directory; git's index and ref lock files do not
//! tolerate concurrent commands.
//!
//! Handles are created lazily and kept for the life of the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::MutexGuard;
use tracing::{info, warn};

use crate::effects::{GitEffect, GitInterpreter, GitResponse};
use crate::types::{RepoId, Repository, Sha};

use super::{CommitIdentity, GitError, GitResult, git_command, run_git, run_logged};

/// Owns the local clones under a base directory.
#[derive(Debug)]
pub struct RepoManager {
    base_dir: PathBuf,
    identity: CommitIdentity,
    handles: Mutex<HashMap<PathBuf, Arc<RepoHandle>>>,
}

impl RepoManager {
    /// Creates a manager that keeps clones under `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, identity: CommitIdentity) -> Self {
        RepoManager {
            base_dir: base_dir.into(),
            identity,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the local clone path for a repository: `<base>/<owner>/<repo>`.
    pub fn local_path(&self, repo: &RepoId) -> PathBuf {
        self.base_dir.join(&repo.owner).join(&repo.repo)
    }

    /// Looks up or creates the handle for `path`.
    ///
    /// The same path always yields the same handle.
    pub fn handle(&self, path: &Path) -> Arc<RepoHandle> {
        // A poisoned map is still consistent: entries are only ever inserted.
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles
            .entry(path.to_path_buf())
            .or_insert_with(|| {
                Arc::new(RepoHandle {
                    path: path.to_path_buf(),
                    lock: tokio::sync::Mutex::new(()),
                })
            })
            .clone()
    }

    /// Clones `repo` if there is no local copy yet, otherwise fetches it.
    ///
    /// The commit identity is (re)written on every update, so a clone whose
    /// configuration step failed part way is repaired by the next call.
    ///
    /// Returns the handle in either case. Idempotent and safe to call
    /// concurrently; callers for the same repository queue on its handle.
    pub async fn get_updated_repo(&self, repo: &Repository) -> GitResult<Arc<RepoHandle>> {
        let path = self.local_path(&repo.id);
        let handle = self.handle(&path);
        {
            let _guard = handle.lock().await;

            if tokio::fs::try_exists(&path).await? {
                info!(repo = %repo, path = %path.display(), "Fetching latest changes");
                run_git(&path, &["fetch", "origin"]).await?;
            } else {
                info!(repo = %repo, path = %path.display(), "Cloning");
                self.clone_into(&repo.clone_url, &path).await?;
            }
            self.configure_identity(&path).await?;
        }

        Ok(handle)
    }

    async fn clone_into(&self, url: &str, path: &Path) -> GitResult<()> {
        let parent = path.parent().unwrap_or(&self.base_dir);
        tokio::fs::create_dir_all(parent).await?;

        let target = path.to_string_lossy();
        run_git(parent, &["clone", url, &target]).await?;
        Ok(())
    }

    async fn configure_identity(&self, path: &Path) -> GitResult<()> {
        run_git(path, &["config", "user.name", &self.identity.name]).await?;
        run_git(path, &["config", "user.email", &self.identity.email]).await?;
        Ok(())
    }
}

/// A local clone. All git commands against it run under its lock.
#[derive(Debug)]
pub struct RepoHandle {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl RepoHandle {
    /// Returns the working directory of this clone.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Fetches from `origin`.
    pub async fn fetch(&self) -> GitResult<()> {
        let _guard = self.lock().await;
        run_git(&self.path, &["fetch", "origin"]).await?;
        Ok(())
    }

    /// Rebases `branch` onto `upstream` folding in `fixup!`/`squash!`
    /// commits, then force-pushes the result to `destination`.
    ///
    /// Returns the SHA that was pushed.
    ///
    /// # Errors
    ///
    /// - [`GitError::SquashConflict`] if the rebase fails. The rebase is
    ///   aborted before returning.
    /// - [`GitError::CommandFailed`] if the push (or anything else) fails.
    pub async fn autosquash_and_push(
        &self,
        upstream: &str,
        branch: &str,
        destination: &str,
    ) -> GitResult<Sha> {
        let _guard = self.lock().await;

        // Both editors are stubbed for this invocation only: the sequence
        // editor accepts the autosquash todo list and the message editor
        // accepts the combined message of `squash!` commits.
        let mut rebase = git_command(&self.path);
        rebase.env("GIT_SEQUENCE_EDITOR", "true");
        rebase.env("GIT_EDITOR", "true");
        let rebased = run_logged(
            rebase,
            &["rebase", "--interactive", "--autosquash", upstream, branch],
        )
        .await;

        if let Err(err) = rebased {
            warn!(path = %self.path.display(), error = %err, "Autosquash rebase failed; aborting");
            if let Err(abort_err) = run_git(&self.path, &["rebase", "--abort"]).await {
                warn!(error = %abort_err, "Also failed to abort the rebase");
            }
            return Err(GitError::SquashConflict {
                branch: branch.to_string(),
                source: Box::new(err),
            });
        }

        let refspec = format!("HEAD:refs/heads/{}", destination);
        run_git(&self.path, &["push", "--force", "origin", &refspec]).await?;

        let head = run_git(&self.path, &["rev-parse", "HEAD"]).await?;
        let head = head.trim();
        Sha::parse(head).map_err(|_| GitError::InvalidSha(head.to_string()))
    }

    /// Deletes `branch` on `origin`.
    ///
    /// A branch that does not exist is an error, not a no-op.
    pub async fn delete_remote_branch(&self, branch: &str) -> GitResult<()> {
        let _guard = self.lock().await;
        run_git(&self.path, &["push", "origin", "--delete", branch]).await?;
        Ok(())
    }
}

impl GitInterpreter for RepoManager {
    type Error = GitError;

    async fn interpret(&self, effect: GitEffect) -> Result<GitResponse, Self::Error> {
        match effect {
            GitEffect::AutosquashAndPush {
                repo,
                upstream,
                branch,
                destination,
            } => {
                let handle = self.get_updated_repo(&repo).await?;
                let head = handle
                    .autosquash_and_push(&upstream, &branch, &destination)
                    .await?;
                Ok(GitResponse::Pushed { head })
            }
            GitEffect::DeleteRemoteBranch { repo, branch } => {
                let handle = self.get_updated_repo(&repo).await?;
                handle.delete_remote_branch(&branch).await?;
                Ok(GitResponse::BranchDeleted)
            }
        }
    }
}
