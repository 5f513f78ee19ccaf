use std::process::Command;

use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::types::{
    CombinedStatus, Comment, FileDiff, Forge, Issue, ItemState, NewPullRequest, PageRequest,
    PullRequest, Repo,
};

pub fn get_github_token() -> Result<String> {
    // Prefer environment variables over gh CLI to avoid subprocess overhead.
    for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
        if let Ok(token) = std::env::var(var)
            && !token.trim().is_empty()
        {
            return Ok(token.trim().to_string());
        }
    }

    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .context("GITHUB_TOKEN is not set and the gh CLI is not available")?;

    if !output.status.success() {
        anyhow::bail!("Failed to get GitHub token from gh CLI. Please set GITHUB_TOKEN or run 'gh auth login'");
    }

    let token = String::from_utf8(output.stdout)?.trim().to_string();

    if token.is_empty() {
        anyhow::bail!("Empty token returned from gh CLI");
    }

    Ok(token)
}

#[derive(Debug, Deserialize)]
struct Comparison {
    #[serde(default)]
    files: Vec<FileDiff>,
}

#[derive(Debug, Deserialize)]
struct MergeOutcome {
    merged: bool,
    #[serde(default)]
    message: String,
}

/// [`Forge`] backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHub {
    client: Octocrab,
}

impl GitHub {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Creates an authenticated client using available credentials.
    pub fn from_env() -> Result<Self> {
        let token = get_github_token().context("Failed to obtain GitHub authentication token")?;
        let client = Octocrab::builder()
            .personal_token(token)
            .build()
            .context("Failed to create GitHub client")?;
        Ok(Self::new(client))
    }
}

fn repo_route(repo: &Repo, rest: &str) -> String {
    format!("/repos/{}/{}/{}", repo.owner(), repo.name(), rest)
}

#[async_trait]
impl Forge for GitHub {
    async fn pull_request(&self, repo: &Repo, number: u64) -> Result<PullRequest> {
        let route = repo_route(repo, &format!("pulls/{number}"));
        self.client
            .get(route, None::<&()>)
            .await
            .with_context(|| format!("Failed to fetch pull request #{number} of {repo}"))
    }

    async fn list_pull_requests(
        &self,
        repo: &Repo,
        page: &PageRequest,
    ) -> Result<Vec<PullRequest>> {
        debug!(%repo, page = page.page, "listing pull requests");
        self.client
            .get(repo_route(repo, "pulls"), Some(page))
            .await
            .with_context(|| format!("Failed to list pull requests of {repo}"))
    }

    async fn create_pull_request(&self, repo: &Repo, new: &NewPullRequest) -> Result<PullRequest> {
        self.client
            .post(repo_route(repo, "pulls"), Some(new))
            .await
            .with_context(|| format!("Failed to create pull request from '{}'", new.head))
    }

    async fn merge_pull_request(&self, repo: &Repo, number: u64) -> Result<()> {
        let route = repo_route(repo, &format!("pulls/{number}/merge"));
        let outcome: MergeOutcome = self
            .client
            .put(route, Some(&json!({})))
            .await
            .with_context(|| format!("Failed to merge pull request #{number}"))?;

        if !outcome.merged {
            anyhow::bail!("Pull request #{} was not merged: {}", number, outcome.message);
        }
        Ok(())
    }

    async fn close_pull_request(&self, repo: &Repo, number: u64) -> Result<()> {
        let route = repo_route(repo, &format!("pulls/{number}"));
        let _: serde_json::Value = self
            .client
            .patch(route, Some(&json!({ "state": ItemState::Closed })))
            .await
            .with_context(|| format!("Failed to close pull request #{number}"))?;
        Ok(())
    }

    async fn compare(&self, repo: &Repo, base: &str, head: &str) -> Result<Vec<FileDiff>> {
        let route = repo_route(repo, &format!("compare/{base}...{head}"));
        let comparison: Comparison = self
            .client
            .get(route, None::<&()>)
            .await
            .with_context(|| format!("Failed to compare {base}...{head}"))?;
        Ok(comparison.files)
    }

    async fn combined_status(&self, repo: &Repo, sha: &str) -> Result<CombinedStatus> {
        let route = repo_route(repo, &format!("commits/{sha}/status"));
        self.client
            .get(route, None::<&()>)
            .await
            .with_context(|| format!("Failed to fetch combined status for {sha}"))
    }

    async fn issue(&self, repo: &Repo, number: u64) -> Result<Issue> {
        let route = repo_route(repo, &format!("issues/{number}"));
        self.client
            .get(route, None::<&()>)
            .await
            .with_context(|| format!("Failed to fetch issue #{number} of {repo}"))
    }

    async fn list_issues(&self, repo: &Repo, page: &PageRequest) -> Result<Vec<Issue>> {
        debug!(%repo, page = page.page, "listing issues");
        self.client
            .get(repo_route(repo, "issues"), Some(page))
            .await
            .with_context(|| format!("Failed to list issues of {repo}"))
    }

    async fn list_comments(
        &self,
        repo: &Repo,
        number: u64,
        page: &PageRequest,
    ) -> Result<Vec<Comment>> {
        let route = repo_route(repo, &format!("issues/{number}/comments"));
        self.client
            .get(route, Some(page))
            .await
            .with_context(|| format!("Failed to list comments of #{number}"))
    }

    async fn create_comment(&self, repo: &Repo, number: u64, body: &str) -> Result<()> {
        let route = repo_route(repo, &format!("issues/{number}/comments"));
        let _: serde_json::Value = self
            .client
            .post(route, Some(&json!({ "body": body })))
            .await
            .with_context(|| format!("Failed to post comment on #{number}"))?;
        Ok(())
    }

    async fn set_issue_state(&self, repo: &Repo, number: u64, state: ItemState) -> Result<()> {
        let route = repo_route(repo, &format!("issues/{number}"));
        let _: serde_json::Value = self
            .client
            .patch(route, Some(&json!({ "state": state })))
            .await
            .with_context(|| format!("Failed to mark issue #{number} {state}"))?;
        Ok(())
    }
}
