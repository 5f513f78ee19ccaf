use std::process::Command;

use anyhow::{Context, Result};

use crate::types::{CommitMessage, Repo};

fn git(args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .output()
        .context("Failed to run git")?;

    if !output.status.success() {
        anyhow::bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    String::from_utf8(output.stdout).context("git produced non-UTF-8 output")
}

/// Resolves the repository the current checkout's `origin` remote points at.
pub fn origin_repo() -> Result<Repo> {
    let url = git(&["config", "--get", "remote.origin.url"])?;
    Ok(Repo::from_remote_url(&url)?)
}

/// The message of the most recent commit on the current branch.
pub fn last_commit_message() -> Result<CommitMessage> {
    let raw = git(&["log", "-1", "--format=%B"])?;
    Ok(CommitMessage::parse(&raw))
}
