//! Aggregation of paged list endpoints.
//!
//! Pages are numbered from [`FIRST_PAGE`] and requested strictly in order.
//! Iteration stops at the first empty page or when the page number reaches
//! `max_pages`; the ceiling is exclusive, so `max_pages = k` requests at most
//! `k - 1` pages.

use std::future::Future;

use anyhow::Result;
use futures::{Stream, TryStreamExt, stream};
use tracing::debug;

pub const FIRST_PAGE: u32 = 1;

/// Default ceiling for list commands.
pub const DEFAULT_MAX_PAGES: u32 = 5;

/// Yields one page at a time, lazily. Each poll issues at most one request.
pub fn page_stream<T, F, Fut>(fetch_page: F, max_pages: u32) -> impl Stream<Item = Result<Vec<T>>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    stream::try_unfold(
        (fetch_page, FIRST_PAGE),
        move |(mut fetch_page, page)| async move {
            if page >= max_pages {
                debug!(page, max_pages, "page ceiling reached");
                return Ok(None);
            }

            let items = fetch_page(page).await?;
            debug!(page, count = items.len(), "fetched page");

            if items.is_empty() {
                return Ok(None);
            }
            Ok(Some((items, (fetch_page, page + 1))))
        },
    )
}

/// Collects every page into a single ordered vector.
///
/// A failing page aborts the whole aggregation; pages fetched before the
/// failure are discarded.
pub async fn fetch_all_pages<T, F, Fut>(fetch_page: F, max_pages: u32) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    page_stream(fetch_page, max_pages).try_concat().await
}
