//! Page walking over a paginated feed.
//!
//! The walker drives an abstract [`PageFetcher`] to completion. How a
//! cursor is extracted from a response is the fetcher's business; the
//! walker only decides when to stop:
//!
//! - a page with zero records ends the result set
//! - a page without an extractable cursor ends the walk even if it had
//!   records (protects against upstream schema drift)
//!
//! A short delay is inserted between page requests.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, Result};

/// Token used to request the next page of a result set.
#[derive(Debug, Clone, PartialEq)]
pub enum Cursor {
    /// Opaque token echoed back to the upstream as-is
    Opaque(Value),

    /// Ranking score + identity of the last record on the page
    ScoreId { score: Value, id: String },

    /// Plain page number
    Page(u64),
}

/// One page of raw records plus the cursor for the next request.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<Value>,
    pub next: Option<Cursor>,
}

/// Abstract page request/response contract.
///
/// Both observed upstream shapes (POST with a cursor echoed in the body,
/// GET with a page-number parameter) implement this.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page. `None` requests the first page.
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<Page>;
}

/// Result of walking one feed: everything fetched before the walk
/// ended, plus the error that cut it short, if any.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub records: Vec<Value>,
    pub error: Option<AppError>,
}

/// Walks one source's paginated feed to completion.
#[derive(Debug, Clone)]
pub struct PageWalker {
    delay: Duration,
    max_pages: u64,
}

impl PageWalker {
    /// Create a walker with the given inter-page delay and page cap
    /// (0 = unlimited).
    pub fn new(delay: Duration, max_pages: u64) -> Self {
        Self { delay, max_pages }
    }

    /// Walk the feed, accumulating all raw records.
    ///
    /// A fetch error ends the walk but keeps the pages already fetched;
    /// the caller reports the source as failed while still using the
    /// partial records.
    pub async fn walk(&self, fetcher: &dyn PageFetcher) -> WalkOutcome {
        let mut records = Vec::new();
        let mut cursor: Option<Cursor> = None;
        let mut page_no: u64 = 0;

        loop {
            page_no += 1;
            if self.max_pages > 0 && page_no > self.max_pages {
                log::warn!("Page cap of {} reached, stopping walk", self.max_pages);
                break;
            }

            let page = match fetcher.fetch_page(cursor.as_ref()).await {
                Ok(page) => page,
                Err(err) => {
                    return WalkOutcome {
                        records,
                        error: Some(err),
                    };
                }
            };
            log::debug!("Page {}: {} records", page_no, page.records.len());

            if page.records.is_empty() {
                break;
            }
            records.extend(page.records);

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        WalkOutcome {
            records,
            error: None,
        }
    }
}
