use std::{fmt, str::FromStr, sync::LazyLock};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Matches both `https://github.com/owner/repo(.git)` and
// `git@github.com:owner/repo(.git)`.
static REMOTE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https://|git@)github\.com[:/](\S+)").expect("remote URL pattern is valid")
});

/// Reasons a repository coordinate could not be resolved.
#[derive(Debug, Error, PartialEq)]
pub enum RepoError {
    #[error("repository owner must not be empty")]
    EmptyOwner,
    #[error("repository name must not be empty")]
    EmptyName,
    #[error("repository must be in format 'owner/repo', got: '{0}'")]
    InvalidFormat(String),
    #[error("invalid url in origin remote: '{0}'")]
    NotGitHub(String),
}

/// A GitHub repository coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repo {
    owner: String,
    name: String,
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, RepoError> {
        let owner = owner.into();
        let name = name.into();
        if owner.trim().is_empty() {
            return Err(RepoError::EmptyOwner);
        }
        if name.trim().is_empty() {
            return Err(RepoError::EmptyName);
        }
        Ok(Self { owner, name })
    }

    /// Parses `owner/repo`.
    pub fn parse(repo: &str) -> Result<Self, RepoError> {
        match repo.split('/').collect::<Vec<_>>().as_slice() {
            [owner, name] => Self::new(*owner, *name),
            _ => Err(RepoError::InvalidFormat(repo.to_string())),
        }
    }

    /// Parses the URL of a git remote hosted on github.com, in either the
    /// HTTPS or the SSH form. A trailing `.git` is ignored.
    pub fn from_remote_url(url: &str) -> Result<Self, RepoError> {
        let url = url.trim();
        let path = REMOTE_URL
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| RepoError::NotGitHub(url.to_string()))?;

        let path = path.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let mut parts = path.split('/');
        match (parts.next(), parts.next()) {
            (Some(owner), Some(name)) => Self::new(owner, name),
            _ => Err(RepoError::NotGitHub(url.to_string())),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// An issue or pull request given on the command line, either as a bare
/// number or as a `https://github.com/owner/repo/(pull|issues)/N` URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRef {
    pub repo: Option<Repo>,
    pub number: u64,
}

impl FromStr for ItemRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(number) = s.strip_prefix('#').unwrap_or(s).parse::<u64>() {
            return Ok(Self { repo: None, number });
        }

        if !s.starts_with("https://") {
            anyhow::bail!("Invalid issue or pull request number: '{}'", s);
        }

        let url = url::Url::parse(s)
            .map_err(|e| anyhow::anyhow!("Failed to parse URL '{}': {}", s, e))?;
        if url.host_str() != Some("github.com") {
            anyhow::bail!("URL must point at github.com, got: '{}'", s);
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        // ["owner", "repo", "pull" | "issues", "123"]
        match segments.as_slice() {
            [owner, name, "pull" | "issues", number] => {
                let number = number
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid number in URL: '{}'", s))?;
                Ok(Self {
                    repo: Some(Repo::new(*owner, *name)?),
                    number,
                })
            }
            _ => anyhow::bail!(
                "URL must be in format https://github.com/owner/repo/pull/123, got: '{}'",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct User {
    pub login: String,
}

/// State of an issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Open,
    Closed,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Open => "open",
            ItemState::Closed => "closed",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub user: User,
    pub state: ItemState,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    pub updated_at: DateTime<Utc>,
}

/// One end of a pull request: the branch name and the commit it points at.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CommitRef {
    #[serde(rename = "ref")]
    pub branch: String,
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub user: User,
    pub state: ItemState,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    pub updated_at: DateTime<Utc>,
    pub head: CommitRef,
    pub base: CommitRef,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Comment {
    pub user: User,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Commit status as reported by the combined status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Success,
    Pending,
    Failure,
    Error,
}

impl StatusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusState::Success => "success",
            StatusState::Pending => "pending",
            StatusState::Failure => "failure",
            StatusState::Error => "error",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, StatusState::Pending)
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CommitStatus {
    pub state: StatusState,
    pub context: String,
    #[serde(default)]
    pub target_url: Option<String>,
}

/// Aggregate of all statuses attached to one commit.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CombinedStatus {
    pub state: StatusState,
    #[serde(default)]
    pub statuses: Vec<CommitStatus>,
}

impl CombinedStatus {
    /// Statuses that have not succeeded.
    pub fn unsuccessful(&self) -> impl Iterator<Item = &CommitStatus> {
        self.statuses
            .iter()
            .filter(|status| status.state != StatusState::Success)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FileDiff {
    pub filename: String,
    #[serde(default)]
    pub patch: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    #[default]
    Open,
    Closed,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

/// Filter and ordering applied to list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListFilter {
    pub state: StateFilter,
    pub sort: SortField,
    pub direction: Direction,
}

/// Query parameters for one page of a list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u8>,
}

impl PageRequest {
    pub fn new(page: u32) -> Self {
        Self {
            state: None,
            sort: None,
            direction: None,
            page,
            per_page: None,
        }
    }

    pub fn per_page(mut self, per_page: u8) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn filtered(mut self, filter: &ListFilter) -> Self {
        self.state = Some(filter.state);
        self.sort = Some(filter.sort);
        self.direction = Some(filter.direction);
        self
    }
}

/// Title and body of a commit message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommitMessage {
    pub title: String,
    pub body: String,
}

impl CommitMessage {
    /// Splits raw `git log --format=%B` output into the subject line and
    /// the remaining body, trimming each line.
    pub fn parse(raw: &str) -> Self {
        let mut lines = raw.lines().map(str::trim);
        let title = lines.next().unwrap_or_default().to_string();
        let body = lines
            .skip_while(|line| line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
            .trim_end()
            .to_string();
        Self { title, body }
    }
}

/// The issue tracker behind every command.
///
/// List methods return a single page; aggregation is done by
/// [`crate::pagination::fetch_all_pages`].
#[async_trait]
pub trait Forge {
    async fn pull_request(&self, repo: &Repo, number: u64) -> Result<PullRequest>;

    async fn list_pull_requests(&self, repo: &Repo, page: &PageRequest)
    -> Result<Vec<PullRequest>>;

    async fn create_pull_request(&self, repo: &Repo, new: &NewPullRequest) -> Result<PullRequest>;

    async fn merge_pull_request(&self, repo: &Repo, number: u64) -> Result<()>;

    async fn close_pull_request(&self, repo: &Repo, number: u64) -> Result<()>;

    async fn compare(&self, repo: &Repo, base: &str, head: &str) -> Result<Vec<FileDiff>>;

    async fn combined_status(&self, repo: &Repo, sha: &str) -> Result<CombinedStatus>;

    async fn issue(&self, repo: &Repo, number: u64) -> Result<Issue>;

    async fn list_issues(&self, repo: &Repo, page: &PageRequest) -> Result<Vec<Issue>>;

    /// Conversation comments; pull requests share these with issues.
    async fn list_comments(&self, repo: &Repo, number: u64, page: &PageRequest)
    -> Result<Vec<Comment>>;

    async fn create_comment(&self, repo: &Repo, number: u64, body: &str) -> Result<()>;

    async fn set_issue_state(&self, repo: &Repo, number: u64, state: ItemState) -> Result<()>;
}
