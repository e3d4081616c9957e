//! Local git operations for squashing fixup commits.
//!
//! This module owns the bot's local clones:
//! - Clone-or-fetch of a repository into `<repos_dir>/<owner>/<repo>`
//! - Non-interactive `rebase --autosquash` followed by a force push
//! - Deleting a merged head branch on the remote
//!
//! Every git invocation runs through [`git_command`], which isolates it from
//! system and user configuration and forbids terminal prompts. Output is
//! streamed to the log line by line while the command runs, since clones and
//! rebases can take tens of seconds.

pub mod repos;

use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

pub use repos::{RepoHandle, RepoManager};

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Git command exited unsuccessfully.
    #[error("git command failed: {command}\noutput: {output}")]
    CommandFailed { command: String, output: String },

    /// The autosquash rebase could not be applied cleanly.
    ///
    /// The rebase has been aborted and the working tree is clean again. This
    /// is a recoverable condition: the author has to squash manually.
    #[error("squash conflict while rebasing {branch}: {source}")]
    SquashConflict {
        branch: String,
        #[source]
        source: Box<GitError>,
    },

    /// Git printed something that is not a commit SHA where one was expected.
    #[error("invalid SHA in git output: {0}")]
    InvalidSha(String),

    /// IO error (spawning git, creating directories).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// Returns true for the recoverable squash-conflict case.
    pub fn is_squash_conflict(&self) -> bool {
        matches!(self, GitError::SquashConflict { .. })
    }
}

/// Result type for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Identity used for commits the bot creates while rebasing.
///
/// Written into the local config of each clone on every update, since global and
/// system config are disabled for every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    /// The committer name (git `user.name`).
    pub name: String,

    /// The committer email (git `user.email`).
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        CommitIdentity {
            name: "GitHub Review Helper".to_string(),
            email: "review-helper@users.noreply.github.com".to_string(),
        }
    }
}

/// Create a git Command with clean environment (no system/user config).
///
/// This ensures consistent behavior across different machines by ignoring
/// system and user git configuration (e.g., rerere, hooks, aliases).
pub(crate) fn git_command(workdir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(workdir);

    cmd.env("GIT_CONFIG_NOSYSTEM", "1");
    cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
    cmd.env("GIT_TERMINAL_PROMPT", "0");

    cmd
}

/// Runs git with `args` in `workdir`, streaming its output to the log.
///
/// Returns the combined stdout and stderr on success.
pub(crate) async fn run_git(workdir: &Path, args: &[&str]) -> GitResult<String> {
    run_logged(git_command(workdir), args).await
}

/// Runs a prepared git command, logging each output line as it arrives.
///
/// Stdout and stderr are read concurrently so neither pipe can fill up and
/// stall the child.
pub(crate) async fn run_logged(mut cmd: Command, args: &[&str]) -> GitResult<String> {
    let command = format!("git {}", args.join(" "));
    debug!(command = %command, "Running git");

    let mut child = cmd
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (out, err) = tokio::join!(stream_lines(stdout, &command), stream_lines(stderr, &command));
    let status = child.wait().await?;

    let mut output = out?;
    output.push_str(&err?);

    if status.success() {
        Ok(output)
    } else {
        Err(GitError::CommandFailed { command, output })
    }
}

async fn stream_lines<R>(pipe: Option<R>, command: &str) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut collected = String::new();
    let Some(pipe) = pipe else {
        return Ok(collected);
    };
    let mut lines = BufReader::new(pipe).lines();
    while let Some(line) = lines.next_line().await? {
        debug!(command = %command, "git: {}", line);
        collected.push_str(&line);
        collected.push('\n');
    }
    Ok(collected)
}
