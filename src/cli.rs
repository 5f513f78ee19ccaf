use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::{
    config::parse_duration,
    git,
    pagination::DEFAULT_MAX_PAGES,
    types::{Direction, ItemRef, ListFilter, Repo, SortField, StateFilter},
    watch::{DEFAULT_INTERVAL, WatchOptions},
};

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

#[derive(Parser, Debug)]
#[command(
    name = "barb",
    about = "Read, answer and manage GitHub issues and pull requests from the terminal"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
pub struct Cli {
    /// GitHub repository in format 'owner/repo' (defaults to the origin remote)
    #[arg(
        short = 'r',
        long = "repo",
        value_name = "OWNER/REPO",
        global = true,
        value_parser = Repo::parse
    )]
    pub repo: Option<Repo>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Work with issues
    #[command(subcommand)]
    Issue(IssueCommand),

    /// Work with pull requests
    #[command(subcommand, visible_alias = "prs")]
    Pr(PrCommand),
}

#[derive(Subcommand, Debug)]
pub enum IssueCommand {
    /// List issues
    List(ListArgs),
    /// Show an issue and its comments
    Get(ItemArgs),
    /// Compose a comment in $EDITOR and post it
    Reply(ItemArgs),
    /// Close an issue
    Close(ItemArgs),
    /// Reopen a closed issue
    Reopen(ItemArgs),
}

#[derive(Subcommand, Debug)]
pub enum PrCommand {
    /// List pull requests with their commit status
    List(ListArgs),
    /// Show a pull request, its commit status and its comments
    Get(ItemArgs),
    /// Compose a comment in $EDITOR and post it
    Reply(ItemArgs),
    /// Open a pull request from a branch
    Create(CreateArgs),
    /// Merge a pull request
    Merge(ItemArgs),
    /// Close a pull request without merging
    Close(ItemArgs),
    /// Show the changes of a pull request
    Diff(ItemArgs),
    /// Wait until the commit status of pull requests settles
    #[command(visible_alias = "watch-hooks")]
    Watch(WatchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only list items in this state
    #[arg(short = 's', long, value_enum, default_value_t)]
    pub state: StateFilter,

    /// Sort field
    #[arg(short = 'b', long = "sort-by", value_enum, default_value_t)]
    pub sort: SortField,

    /// Sort direction
    #[arg(short = 'd', long, value_enum, default_value_t)]
    pub direction: Direction,

    /// Page ceiling; at most NUM - 1 pages are fetched
    #[arg(
        long = "max-pages",
        env = "BARB_MAX_PAGES",
        default_value_t = DEFAULT_MAX_PAGES,
        value_name = "NUM"
    )]
    pub max_pages: u32,
}

impl ListArgs {
    pub fn filter(&self) -> ListFilter {
        ListFilter {
            state: self.state,
            sort: self.sort,
            direction: self.direction,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ItemArgs {
    /// NUMBER|URL
    #[arg(value_name = "ID")]
    pub item: ItemRef,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Branch holding the changes
    pub head: String,

    /// Title (defaults to the subject of the last commit)
    #[arg(short = 't', long)]
    pub title: Option<String>,

    /// Branch to merge into
    #[arg(long, default_value = "master")]
    pub base: String,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// NUMBER|URL ...
    #[arg(value_name = "ID", required = true, num_args = 1..)]
    pub items: Vec<ItemRef>,

    /// Time between polls (e.g. 45, 30s, 5m, 1h; unitless implies seconds)
    #[arg(long, value_parser = parse_duration, value_name = "DURATION")]
    pub interval: Option<Duration>,

    /// Give up after this long
    #[arg(long, value_parser = parse_duration, value_name = "DURATION")]
    pub timeout: Option<Duration>,
}

impl WatchArgs {
    pub fn options(&self) -> WatchOptions {
        WatchOptions {
            interval: self.interval.unwrap_or(DEFAULT_INTERVAL),
            deadline: self.timeout,
        }
    }

    /// Splits the arguments into one repository and the distinct numbers to
    /// watch, in the order given. URLs must all point at the same repository.
    pub fn target(&self, flag: Option<&Repo>) -> Result<(Repo, Vec<u64>)> {
        let mut from_urls = self.items.iter().filter_map(|item| item.repo.as_ref());
        let first = from_urls.next();
        if let Some(other) = from_urls.find(|repo| Some(*repo) != first) {
            anyhow::bail!(
                "Cannot watch pull requests of different repositories ({} and {})",
                first.map(ToString::to_string).unwrap_or_default(),
                other
            );
        }

        let repo = resolve_repo(first, flag)?;
        let mut numbers: Vec<u64> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if !numbers.contains(&item.number) {
                numbers.push(item.number);
            }
        }
        Ok((repo, numbers))
    }
}

/// Picks the repository for a command: the one named by an item URL, then
/// `--repo`, then the origin remote of the current checkout.
pub fn resolve_repo(from_item: Option<&Repo>, flag: Option<&Repo>) -> Result<Repo> {
    if let Some(repo) = from_item.or(flag) {
        return Ok(repo.clone());
    }
    git::origin_repo().context("No repository given; use --repo OWNER/REPO or run inside a clone")
}

/// Parses command-line arguments.
pub fn parse_args<I, T>(args: I) -> Result<Cli>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Ok(Cli::try_parse_from(args)?)
}
