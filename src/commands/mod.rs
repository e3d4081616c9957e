//! Commands issued in PR comments.
//!
//! - `!squash` - autosquash the PR's fixup commits and force-push
//! - `!check` - report whether the PR has commits left to squash
//! - `!merge` - merge the PR once its combined status is green
//!
//! A `+1` anywhere in a comment marks the PR as peer reviewed.
//!
//! # Example
//!
//! ```
//! use review_helper::commands::{Command, parse_command};
//!
//! assert_eq!(parse_command("!merge\n\nThanks for the review!"), Some(Command::Merge));
//! assert_eq!(parse_command("Looks good, !merge"), None);
//! ```

mod parser;
mod types;

pub use parser::{is_plus_one, parse_command};
pub use types::Command;
