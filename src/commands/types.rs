//! Command types for the review helper.

use std::fmt;

/// A command issued in a PR comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `!squash`: fold `fixup!`/`squash!` commits into their targets and
    /// force-push the result.
    Squash,

    /// `!check`: report whether the PR still has commits to squash.
    Check,

    /// `!merge`: claim the PR for merging and merge it once CI passes.
    Merge,
}

impl Command {
    /// The word that invokes this command.
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Squash => "!squash",
            Command::Check => "!check",
            Command::Merge => "!merge",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
