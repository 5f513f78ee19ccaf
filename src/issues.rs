use anyhow::Result;
use tracing::debug;

use crate::{
    pagination::fetch_all_pages,
    pulls::all_comments,
    types::{Comment, Forge, Issue, ItemState, ListFilter, PageRequest, Repo},
};

/// Everything `issue get` shows.
#[derive(Debug, Clone)]
pub struct IssueThread {
    pub issue: Issue,
    pub comments: Vec<Comment>,
}

/// Lists issues across pages. The upstream endpoint also returns pull
/// requests; they are kept as returned.
pub async fn list<F>(
    forge: &F,
    repo: &Repo,
    filter: &ListFilter,
    max_pages: u32,
) -> Result<Vec<Issue>>
where
    F: Forge + Sync,
{
    let issues = fetch_all_pages(
        move |page| async move {
            let request = PageRequest::new(page).filtered(filter);
            forge.list_issues(repo, &request).await
        },
        max_pages,
    )
    .await?;
    debug!(%repo, count = issues.len(), "listed issues");
    Ok(issues)
}

pub async fn thread<F>(forge: &F, repo: &Repo, number: u64) -> Result<IssueThread>
where
    F: Forge + Sync,
{
    let issue = forge.issue(repo, number).await?;
    let comments = all_comments(forge, repo, number).await?;
    Ok(IssueThread { issue, comments })
}

pub async fn reply<F>(forge: &F, repo: &Repo, number: u64, body: &str) -> Result<()>
where
    F: Forge + Sync,
{
    crate::pulls::reply(forge, repo, number, body).await
}

pub async fn set_state<F>(forge: &F, repo: &Repo, number: u64, state: ItemState) -> Result<()>
where
    F: Forge + Sync,
{
    forge.set_issue_state(repo, number, state).await
}
