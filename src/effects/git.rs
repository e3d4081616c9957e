//! Local git effect types.
//!
//! The review engine describes the git work it needs as data; the
//! [`RepoManager`](crate::git::RepoManager) interprets these effects against
//! its local clones.


use crate::types::{Repository, Sha};

/// A local git effect. Each effect names the repository it operates on; the
/// interpreter clones or fetches that repository first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GitEffect {
    /// Rebase `branch` onto `upstream` with `--autosquash`, then force-push
    /// the result to `destination` on the remote.
    AutosquashAndPush {
        repo: Repository,
        /// Upstream ref, e.g. `origin/main`.
        upstream: String,
        /// The commit (or ref) to rebase, usually the PR head SHA.
        branch: String,
        /// Remote branch name that receives the squashed history.
        destination: String,
    },

    /// Delete `branch` on the remote. Fails if the branch does not exist.
    DeleteRemoteBranch { repo: Repository, branch: String },
}

/// Response from a git effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitResponse {
    /// Response to `AutosquashAndPush`: the SHA now at the destination branch.
    Pushed { head: Sha },

    /// Response to `DeleteRemoteBranch`.
    BranchDeleted,
}
