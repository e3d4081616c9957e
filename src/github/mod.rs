//! GitHub API client and effect interpreter.
//!
//! Executes [`GitHubEffect`](crate::effects::GitHubEffect)s through octocrab
//! and classifies failures so callers can tell a moved PR head from a flaky
//! request from a request that will never succeed.

mod client;
mod error;
mod interpreter;

pub use client::OctocrabClient;
pub use error::{GitHubApiError, GitHubErrorKind, is_head_modified_message};
