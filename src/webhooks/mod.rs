//! Webhook handling for GitHub events.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - Parsing of the `issue_comment`, `pull_request` and `status` payloads
//! - Dispatch of parsed events to the review workflows

pub mod dispatch;
pub mod events;
pub mod parser;
pub mod signature;

pub use dispatch::dispatch;
pub use events::{
    CommentAction, GitHubEvent, IssueComment, PrAction, PullRequestEvent, StatusEvent,
};
pub use parser::{ParseError, parse_webhook};
pub use signature::{SignatureError, WebhookSecret};
