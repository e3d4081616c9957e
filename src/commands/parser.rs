//! Parser for commands in comment text.

use super::types::Command;

/// Parses the command a comment starts with.
///
/// The comment is trimmed and its first whitespace-separated word must be a
/// command keyword exactly. Free text may follow on the same line or on
/// later lines.
///
/// # Examples
///
/// ```
/// use review_helper::commands::{Command, parse_command};
///
/// assert_eq!(parse_command("  !merge\n"), Some(Command::Merge));
/// assert_eq!(parse_command("!squash please"), Some(Command::Squash));
/// assert_eq!(parse_command("!check\n\nAfter the rebase."), Some(Command::Check));
///
/// assert_eq!(parse_command("!mergethis"), None);
/// assert_eq!(parse_command("please !merge"), None);
/// assert_eq!(parse_command("!MERGE"), None);
/// ```
pub fn parse_command(text: &str) -> Option<Command> {
    let first_word = text.split_whitespace().next()?;
    [Command::Squash, Command::Check, Command::Merge]
        .into_iter()
        .find(|command| command.keyword() == first_word)
}

/// Whether a comment gives the PR a `+1`.
///
/// `+1` may appear anywhere in the comment, including as the `:+1:` emoji,
/// but not as the start of a longer number or glued to a preceding word.
///
/// # Examples
///
/// ```
/// use review_helper::commands::is_plus_one;
///
/// assert!(is_plus_one("Looking good! +1"));
/// assert!(is_plus_one("Good job! :+1:"));
/// assert!(!is_plus_one("Wow +1832 -534 changes. Slow down!"));
/// ```
pub fn is_plus_one(text: &str) -> bool {
    text.match_indices("+1").any(|(start, token)| {
        let before = text[..start].chars().next_back();
        let after = text[start + token.len()..].chars().next();
        let standalone_before = before.is_none_or(|c| !c.is_alphanumeric() && c != '+');
        let standalone_after = after.is_none_or(|c| !c.is_ascii_digit());
        standalone_before && standalone_after
    })
}
