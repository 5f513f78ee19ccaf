use anyhow::{Context, Result};
use tracing::debug;

use crate::{
    pagination::fetch_all_pages,
    types::{
        CombinedStatus, Comment, FileDiff, Forge, ListFilter, NewPullRequest, PageRequest,
        PullRequest, Repo,
    },
};

/// Page size used when aggregating comments.
pub const COMMENTS_PER_PAGE: u8 = 100;

/// Page ceiling used when aggregating comments.
pub const COMMENTS_MAX_PAGES: u32 = 50;

/// A listed pull request together with the combined status of its head.
#[derive(Debug, Clone)]
pub struct PullRequestSummary {
    pub pr: PullRequest,
    pub status: CombinedStatus,
}

/// Everything `pr get` shows.
#[derive(Debug, Clone)]
pub struct PullRequestThread {
    pub pr: PullRequest,
    pub status: CombinedStatus,
    pub comments: Vec<Comment>,
}

/// Aggregates every conversation comment of an issue or pull request.
pub async fn all_comments<F>(forge: &F, repo: &Repo, number: u64) -> Result<Vec<Comment>>
where
    F: Forge + Sync,
{
    fetch_all_pages(
        move |page| async move {
            let request = PageRequest::new(page).per_page(COMMENTS_PER_PAGE);
            forge.list_comments(repo, number, &request).await
        },
        COMMENTS_MAX_PAGES,
    )
    .await
}

/// Lists pull requests across pages, then looks up the combined status of
/// each head commit in list order.
pub async fn list<F>(
    forge: &F,
    repo: &Repo,
    filter: &ListFilter,
    max_pages: u32,
) -> Result<Vec<PullRequestSummary>>
where
    F: Forge + Sync,
{
    let prs = fetch_all_pages(
        move |page| async move {
            let request = PageRequest::new(page).filtered(filter);
            forge.list_pull_requests(repo, &request).await
        },
        max_pages,
    )
    .await?;
    debug!(%repo, count = prs.len(), "listed pull requests");

    let mut summaries = Vec::with_capacity(prs.len());
    for pr in prs {
        let status = forge.combined_status(repo, &pr.head.sha).await?;
        summaries.push(PullRequestSummary { pr, status });
    }
    Ok(summaries)
}

pub async fn thread<F>(forge: &F, repo: &Repo, number: u64) -> Result<PullRequestThread>
where
    F: Forge + Sync,
{
    let pr = forge.pull_request(repo, number).await?;
    let status = forge.combined_status(repo, &pr.head.sha).await?;
    let comments = all_comments(forge, repo, number).await?;
    Ok(PullRequestThread {
        pr,
        status,
        comments,
    })
}

/// Per-file patches between the pull request's base and head commits.
pub async fn diff<F>(forge: &F, repo: &Repo, number: u64) -> Result<Vec<FileDiff>>
where
    F: Forge + Sync,
{
    let pr = forge.pull_request(repo, number).await?;
    forge
        .compare(repo, &pr.base.sha, &pr.head.sha)
        .await
        .with_context(|| format!("Failed to diff pull request #{}", number))
}

pub async fn create<F>(forge: &F, repo: &Repo, new: &NewPullRequest) -> Result<PullRequest>
where
    F: Forge + Sync,
{
    if new.title.trim().is_empty() {
        anyhow::bail!("pull request title must not be empty");
    }
    forge.create_pull_request(repo, new).await
}

pub async fn merge<F>(forge: &F, repo: &Repo, number: u64) -> Result<()>
where
    F: Forge + Sync,
{
    forge.merge_pull_request(repo, number).await
}

pub async fn close<F>(forge: &F, repo: &Repo, number: u64) -> Result<()>
where
    F: Forge + Sync,
{
    forge.close_pull_request(repo, number).await
}

/// Posts `body` as a conversation comment. Blank bodies are rejected before
/// anything is sent.
pub async fn reply<F>(forge: &F, repo: &Repo, number: u64, body: &str) -> Result<()>
where
    F: Forge + Sync,
{
    if body.trim().is_empty() {
        anyhow::bail!("no content to post");
    }
    forge.create_comment(repo, number, body).await
}
