//! Barb: GitHub issues and pull requests from the terminal.
//!
//! Lists, reads, answers and manages issues and pull requests through the
//! GitHub REST API. Long output is shown in a pager and replies are composed
//! in the user's editor, both run on a pseudo-terminal bridged to the real
//! one. List commands aggregate paged endpoints; pull request status can be
//! watched until it settles.

pub mod cli;
pub mod compose;
pub mod config;
pub mod git;
pub mod github;
pub mod issues;
pub mod pagination;
pub mod pulls;
pub mod terminal;
pub mod types;
pub mod watch;

pub use cli::{Cli, parse_args};
pub use config::Config;
pub use github::GitHub;
pub use pagination::{fetch_all_pages, page_stream};
pub use terminal::{BridgeError, run_interactive};
pub use types::{
    CombinedStatus, Comment, CommitMessage, CommitRef, CommitStatus, Direction, FileDiff, Forge,
    Issue, ItemRef, ItemState, ListFilter, NewPullRequest, PageRequest, PullRequest, Repo,
    RepoError, SortField, StateFilter, StatusState, User,
};
pub use watch::{Completion, WatchError, WatchOptions, watch_pull_requests};
