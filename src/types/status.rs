//! Commit status states shared by status events, combined statuses and the
//! statuses the bot reports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The state of a commit status (or of a combined status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    /// Check is pending.
    Pending,
    /// Check succeeded.
    Success,
    /// Check failed.
    Failure,
    /// Check errored.
    Error,
}

impl StatusState {
    /// Returns the API string for this state.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            StatusState::Pending => "pending",
            StatusState::Success => "success",
            StatusState::Failure => "failure",
            StatusState::Error => "error",
        }
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

impl FromStr for StatusState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StatusState::Pending),
            "success" => Ok(StatusState::Success),
            "failure" => Ok(StatusState::Failure),
            "error" => Ok(StatusState::Error),
            other => Err(other.to_string()),
        }
    }
}
