//! GitHub Review Helper - A GitHub bot that squashes fixup commits and merges
//! pull requests once their combined status is green.
//!
//! Webhook deliveries are turned into typed events, routed to the review
//! workflows, and answered with the outcome of the first try. Flaky GitHub
//! operations continue on a retry schedule in the background.

pub mod commands;
pub mod config;
pub mod effects;
pub mod git;
pub mod github;
pub mod response;
pub mod retry;
pub mod review;
pub mod server;
pub mod types;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod test_utils;
