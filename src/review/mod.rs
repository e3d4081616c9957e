//! The review workflows: checking for fixup commits, squashing them,
//! marking PRs as peer reviewed, and merging PRs once their combined status
//! is green.
//!
//! Every workflow is a method on [`ReviewEngine`], which turns webhook
//! events into effects and runs the flaky parts on the retry schedule.

mod commits;
mod engine;
mod error;
mod merge;
mod peer;
mod squash;

pub use commits::{ExpectedHead, HeadError, get_commits, includes_fixup_commits, topological_head};
pub use engine::ReviewEngine;
pub use error::ReviewError;
pub use merge::merge_candidates_query;

/// Label marking PRs that should be merged once their status is green.
pub const MERGING_LABEL: &str = "merging";

/// Context of the commit status reporting whether a PR needs squashing.
pub const SQUASH_CONTEXT: &str = "review/squash";

pub const SQUASH_SUCCESS_DESCRIPTION: &str = "No fixup! or squash! commits to be squashed";
pub const SQUASH_PENDING_DESCRIPTION: &str =
    "This PR needs to be squashed with !squash before merging";
pub const SQUASH_FAILURE_DESCRIPTION: &str = "Automatic squash failed. Please squash manually";

/// Context of the commit status set when a reviewer gives a PR a `+1`.
pub const PEER_REVIEW_CONTEXT: &str = "review/peer";
pub const PEER_REVIEW_DESCRIPTION: &str = "This PR has been peer reviewed";
