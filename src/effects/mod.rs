//! Effects: platform and git operations described as data.

pub mod git;
pub mod github;
pub mod interpreter;

pub use git::{GitEffect, GitResponse};
pub use github::{
    BranchData, COMMITS_PER_PAGE, CombinedStatusPage, CommitData, ContextStatus, GitHubEffect,
    GitHubResponse, IssueData, NewStatus, Page, PrData, SEARCH_PER_PAGE, STATUSES_PER_PAGE,
};
pub use interpreter::{GitHubInterpreter, GitInterpreter};
