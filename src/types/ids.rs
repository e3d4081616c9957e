//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different identifiers (e.g., passing a
//! branch name where a commit SHA is expected) and give each one a canonical
//! display form for logs and status messages.

use std::fmt;
use thiserror::Error;

/// A pull request number within a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrNumber(pub u64);

impl fmt::Display for PrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for PrNumber {
    fn from(n: u64) -> Self {
        PrNumber(n)
    }
}

/// Error returned when a string is not a full 40-character hex commit SHA.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid commit SHA {0:?}: expected 40 hex characters")]
pub struct InvalidSha(pub String);

/// A git commit SHA (40 lowercase hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha(String);

impl Sha {
    /// Parses and validates a full commit SHA.
    ///
    /// Uppercase hex is accepted and normalized to lowercase, since GitHub
    /// payloads and `git rev-parse` both emit lowercase.
    pub fn parse(s: impl AsRef<str>) -> Result<Self, InvalidSha> {
        let s = s.as_ref();
        if s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Sha(s.to_ascii_lowercase()))
        } else {
            Err(InvalidSha(s.to_string()))
        }
    }

    /// Returns the SHA as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (7-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A repository as seen from webhook and API payloads: its identity plus the
/// URL the bot clones it from.
///
/// The same value identifies both the platform-side repository and the local
/// clone, which lives at `<repos_dir>/<owner>/<repo>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    pub id: RepoId,
    /// SSH clone URL (`ssh_url` in GitHub payloads).
    pub clone_url: String,
}

impl Repository {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        clone_url: impl Into<String>,
    ) -> Self {
        Repository {
            id: RepoId::new(owner, repo),
            clone_url: clone_url.into(),
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}

/// The identity of a pull request: the key for all per-PR operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Issue {
    pub number: PrNumber,
    pub repository: Repository,
    /// Login of the PR author (or of the commenter, for comment-triggered work).
    pub author: String,
}

impl Issue {
    /// Returns `owner/repo#N`, the form used in logs and responses.
    pub fn full_name(&self) -> String {
        format!("{}{}", self.repository.id, self.number)
    }

    pub fn repo(&self) -> &RepoId {
        &self.repository.id
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.repository.id, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod pr_number {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn display_format(n: u64) {
                let pr = PrNumber(n);
                prop_assert_eq!(format!("{}", pr), format!("#{}", n));
            }
        }
    }

    mod sha {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_accepts_full_hex(s in "[0-9a-f]{40}") {
                let sha = Sha::parse(&s).unwrap();
                prop_assert_eq!(sha.as_str(), s.as_str());
                prop_assert_eq!(sha.short(), &s[..7]);
            }

            #[test]
            fn parse_normalizes_uppercase(s in "[0-9A-F]{40}") {
                let sha = Sha::parse(&s).unwrap();
                prop_assert_eq!(sha.as_str(), s.to_ascii_lowercase());
            }

            #[test]
            fn parse_rejects_wrong_length(s in "[0-9a-f]{0,39}") {
                prop_assert!(Sha::parse(&s).is_err());
            }
        }

        #[test]
        fn parse_rejects_non_hex() {
            let bad = format!("{}g", "a".repeat(39));
            assert_eq!(Sha::parse(&bad), Err(InvalidSha(bad.clone())));
        }
    }

    mod issue {
        use super::*;

        #[test]
        fn full_name_includes_repo_and_number() {
            let issue = Issue {
                number: PrNumber(42),
                repository: Repository::new("salemove", "widgets", "git@github.com:salemove/widgets.git"),
                author: "octocat".to_string(),
            };
            assert_eq!(issue.full_name(), "salemove/widgets#42");
            assert_eq!(issue.to_string(), issue.full_name());
        }
    }
}
