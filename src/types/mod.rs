//! Core domain types for the review helper.
//!
//! Everything here is an immutable fact read from a webhook or API payload.

pub mod ids;
pub mod status;

pub use ids::{InvalidSha, Issue, PrNumber, RepoId, Repository, Sha};
pub use status::StatusState;
