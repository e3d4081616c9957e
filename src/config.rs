//! Command-line and environment configuration.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::git::CommitIdentity;

/// Configuration read from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "review-helper", version, about)]
pub struct Config {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 80)]
    pub port: u16,

    /// Address to bind to.
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: IpAddr,

    /// Token used for every GitHub API call.
    #[arg(long, env = "GITHUB_ACCESS_TOKEN", hide_env_values = true)]
    pub github_access_token: String,

    /// Secret webhook deliveries are signed with.
    #[arg(long, env = "GITHUB_SECRET", hide_env_values = true)]
    pub github_secret: String,

    /// Times (relative to the first try) at which flaky GitHub operations
    /// are tried.
    #[arg(long, env = "GITHUB_API_TRIES", default_value = "0s,10s,30s,3m")]
    pub github_api_tries: String,

    /// Where local clones live. Defaults to `<tmp>/github-review-helper`.
    #[arg(long, env = "REPOS_DIR")]
    pub repos_dir: Option<PathBuf>,

    /// Author and committer name of squashed commits.
    #[arg(long, env = "GIT_USER_NAME")]
    pub git_user_name: Option<String>,

    /// Author and committer email of squashed commits.
    #[arg(long, env = "GIT_USER_EMAIL")]
    pub git_user_email: Option<String>,
}

impl Config {
    /// Delays before each try, from [`github_api_tries`](Self::github_api_tries).
    pub fn tries(&self) -> Result<Vec<Duration>, ConfigError> {
        parse_tries(&self.github_api_tries)
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.repos_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("github-review-helper"))
    }

    pub fn commit_identity(&self) -> CommitIdentity {
        let default = CommitIdentity::default();
        CommitIdentity {
            name: self.git_user_name.clone().unwrap_or(default.name),
            email: self.git_user_email.clone().unwrap_or(default.email),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GITHUB_API_TRIES must list at least one try")]
    NoTries,

    #[error("GITHUB_API_TRIES has an empty entry")]
    EmptyTry,

    #[error("GITHUB_API_TRIES entry {0:?} contains whitespace")]
    Whitespace(String),

    #[error("GITHUB_API_TRIES entry {entry:?} is not a duration: {reason}")]
    InvalidDuration { entry: String, reason: String },
}

/// Parses a comma separated list of try times into the delays between tries.
///
/// ```
/// use std::time::Duration;
/// use review_helper::config::parse_tries;
///
/// assert_eq!(
///     parse_tries("0s,10s,30s,3m").unwrap(),
///     [0, 10, 20, 150].map(Duration::from_secs)
/// );
/// ```
pub fn parse_tries(raw: &str) -> Result<Vec<Duration>, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::NoTries);
    }

    let mut times = raw
        .split(',')
        .map(|entry| {
            if entry.is_empty() {
                Err(ConfigError::EmptyTry)
            } else if entry.chars().any(char::is_whitespace) {
                Err(ConfigError::Whitespace(entry.to_string()))
            } else {
                humantime::parse_duration(entry).map_err(|e| ConfigError::InvalidDuration {
                    entry: entry.to_string(),
                    reason: e.to_string(),
                })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    times.sort();

    let mut previous = Duration::ZERO;
    Ok(times
        .into_iter()
        .map(|time| {
            let delay = time - previous;
            previous = time;
            delay
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_secs).collect()
    }

    #[test]
    fn unsorted_times_are_sorted_first() {
        assert_eq!(parse_tries("30s,0s,10s").unwrap(), secs(&[0, 10, 20]));
    }

    #[test]
    fn first_try_may_be_delayed() {
        assert_eq!(parse_tries("5s").unwrap(), secs(&[5]));
    }

    #[test]
    fn invalid_lists() {
        assert_eq!(parse_tries(""), Err(ConfigError::NoTries));
        assert_eq!(parse_tries("0s,,10s"), Err(ConfigError::EmptyTry));
        assert_eq!(parse_tries("0s,"), Err(ConfigError::EmptyTry));
        assert_eq!(
            parse_tries("0s, 10s"),
            Err(ConfigError::Whitespace(" 10s".to_string()))
        );
        assert!(matches!(
            parse_tries("0s,soon"),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn defaults_from_flags() {
        let config = Config::try_parse_from([
            "review-helper",
            "--github-access-token",
            "token",
            "--github-secret",
            "secret",
        ])
        .unwrap();

        assert_eq!(config.tries().unwrap(), secs(&[0, 10, 20, 150]));
        assert_eq!(config.commit_identity(), CommitIdentity::default());
        assert!(config.repos_dir().ends_with("github-review-helper"));
    }

    #[test]
    fn identity_overrides() {
        let config = Config::try_parse_from([
            "review-helper",
            "--github-access-token",
            "token",
            "--github-secret",
            "secret",
            "--git-user-name",
            "Robot",
        ])
        .unwrap();

        let identity = config.commit_identity();
        assert_eq!(identity.name, "Robot");
        assert_eq!(identity.email, CommitIdentity::default().email);
    }

    proptest! {
        #[test]
        fn delays_sum_to_the_last_time(times in prop::collection::vec(0u64..10_000, 1..8)) {
            let raw = times.iter().map(|t| format!("{t}s")).collect::<Vec<_>>().join(",");
            let delays = parse_tries(&raw).unwrap();
            prop_assert_eq!(delays.len(), times.len());
            let total: Duration = delays.iter().sum();
            prop_assert_eq!(total, Duration::from_secs(*times.iter().max().unwrap()));
        }
    }
}
