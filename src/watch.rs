//! Polling pull requests until their commit statuses settle.
//!
//! One task per pull request polls its head commit's combined status and
//! reports the first non-pending state over a shared channel. The caller
//! drains the channel and sees completions in the order they happen.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{
    sync::mpsc,
    task::JoinSet,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::types::{Forge, Repo, StatusState};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Time between two polls of the same pull request.
    pub interval: Duration,
    /// Upper bound on the whole watch; `None` waits indefinitely.
    pub deadline: Option<Duration>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            deadline: None,
        }
    }
}

/// A pull request whose combined status left `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub number: u64,
    pub state: StatusState,
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("timed out after {limit:?} waiting for {}", describe_pending(.pending))]
    Timeout { limit: Duration, pending: Vec<u64> },
    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

fn describe_pending(pending: &[u64]) -> String {
    pending
        .iter()
        .map(|number| format!("#{number}"))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn poll_until_settled<F>(
    forge: &F,
    repo: &Repo,
    number: u64,
    period: Duration,
) -> anyhow::Result<Completion>
where
    F: Forge + Sync + ?Sized,
{
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let pr = forge.pull_request(repo, number).await?;
        let status = forge.combined_status(repo, &pr.head.sha).await?;
        debug!(number, state = %status.state, "polled combined status");

        if !status.state.is_pending() {
            return Ok(Completion {
                number,
                state: status.state,
            });
        }
    }
}

/// Watches `numbers` until every one of them has settled, calling
/// `on_complete` as each settles.
///
/// Duplicate numbers are watched once. The first polling error aborts the
/// watch. When `options.deadline` elapses first the error lists the pull
/// requests still pending.
pub async fn watch_pull_requests<F, C>(
    forge: Arc<F>,
    repo: &Repo,
    numbers: &[u64],
    options: &WatchOptions,
    mut on_complete: C,
) -> Result<(), WatchError>
where
    F: Forge + Send + Sync + 'static,
    C: FnMut(&Completion),
{
    if options.interval.is_zero() {
        return Err(anyhow::anyhow!("watch interval must be greater than zero").into());
    }

    let mut pending: Vec<u64> = Vec::with_capacity(numbers.len());
    for &number in numbers {
        if !pending.contains(&number) {
            pending.push(number);
        }
    }
    if pending.is_empty() {
        return Ok(());
    }

    let (tx, mut rx) = mpsc::channel(pending.len());
    // Dropping the set aborts any poller still running.
    let mut pollers = JoinSet::new();
    for &number in &pending {
        let forge = Arc::clone(&forge);
        let repo = repo.clone();
        let tx = tx.clone();
        let period = options.interval;
        pollers.spawn(async move {
            let result = poll_until_settled(forge.as_ref(), &repo, number, period).await;
            // The receiver is gone once the watch has returned.
            let _ = tx.send(result).await;
        });
    }
    drop(tx);
    info!(%repo, count = pending.len(), "watching pull requests");

    // A deadline too far away to represent is no deadline at all.
    let deadline = options
        .deadline
        .and_then(|limit| Instant::now().checked_add(limit).map(|at| (limit, at)));

    while !pending.is_empty() {
        let received = match deadline {
            Some((limit, at)) => match time::timeout_at(at, rx.recv()).await {
                Ok(received) => received,
                Err(_) => return Err(WatchError::Timeout { limit, pending }),
            },
            None => rx.recv().await,
        };

        match received {
            Some(Ok(completion)) => {
                pending.retain(|&number| number != completion.number);
                on_complete(&completion);
            }
            Some(Err(err)) => return Err(err.into()),
            None => {
                return Err(anyhow::anyhow!("status pollers stopped before completing").into());
            }
        }
    }

    Ok(())
}
