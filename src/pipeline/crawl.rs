// src/pipeline/crawl.rs

//! Crawl orchestration.
//!
//! Runs every configured source with bounded concurrency, merges the
//! per-source listing maps into one combined snapshot, classifies it
//! against the previous snapshot, hands the changes to the export and
//! notification collaborators, and persists the new snapshot once at
//! the end. A failing source is reported and does not abort siblings;
//! only a failure to persist the combined snapshot fails the run.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::{Config, CrawlerConfig, Listing, SourceConfig};
use crate::pipeline::diff::{ChangeSet, DiffEngine, DiffOptions};
use crate::pipeline::normalize::RecordNormalizer;
use crate::pipeline::walker::PageWalker;
use crate::services::{CatalogClient, Exporter, Notifier};
use crate::storage::{Snapshot, SnapshotStorage};
use crate::utils::http;

/// Listings gathered from one source.
///
/// `failure` carries the message of a mid-walk fetch error; the
/// listings fetched before it still count.
#[derive(Debug, Default)]
pub struct SourceOutcome {
    pub listings: Vec<Listing>,
    pub skipped_records: usize,
    pub failure: Option<String>,
}

/// Summary of one watch run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub sources_ok: usize,
    pub sources_failed: usize,
    /// Feed-level failures: (slug, error detail)
    pub failures: Vec<(String, String)>,
    pub listing_count: usize,
    pub skipped_records: usize,
    pub new_count: usize,
    pub changed_count: usize,
    pub removed_count: usize,
}

/// Crawls one source end to end: walk pages, normalize records.
pub struct SourceCrawler {
    walker: PageWalker,
}

impl SourceCrawler {
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            walker: PageWalker::new(
                Duration::from_millis(config.request_delay_ms),
                config.max_pages,
            ),
        }
    }

    /// Fetch and normalize one source's full listing set.
    ///
    /// Malformed records are skipped and counted. A page-level failure
    /// marks the source as failed but keeps the listings from the pages
    /// fetched before it.
    pub async fn crawl(
        &self,
        client: reqwest::Client,
        source: &SourceConfig,
        fetched_at: DateTime<Utc>,
    ) -> SourceOutcome {
        let fetcher = CatalogClient::new(client, source.clone());
        let walk = self.walker.walk(&fetcher).await;

        let normalizer = RecordNormalizer::new(&source.slug, source.fields.clone(), fetched_at);
        let mut by_id: HashMap<String, Listing> = HashMap::new();
        let mut skipped = 0usize;

        for record in &walk.records {
            match normalizer.normalize(record) {
                Ok(listing) => {
                    by_id.insert(listing.id.clone(), listing);
                }
                Err(e) => {
                    skipped += 1;
                    log::warn!("[{}] skipping record: {}", source.slug, e);
                }
            }
        }

        SourceOutcome {
            listings: by_id.into_values().collect(),
            skipped_records: skipped,
            failure: walk.error.map(|e| e.to_string()),
        }
    }
}

/// Run the full watch pipeline over all configured sources.
pub async fn run_watch(config: &Config, storage: &dyn SnapshotStorage) -> Result<RunSummary> {
    let started = Utc::now();
    let client = http::create_client(&config.crawler)?;
    let crawler = SourceCrawler::new(&config.crawler);

    log::info!("Crawling {} sources...", config.sources.len());

    // Fan out one task per source, bounded by max_concurrent. The
    // merge below is the single synchronization point.
    let concurrency = config.crawler.max_concurrent.max(1);
    let mut outcomes = stream::iter(config.sources.iter())
        .map(|source| {
            let client = client.clone();
            let crawler = &crawler;
            async move {
                let outcome = crawler.crawl(client, source, started).await;
                (source.slug.as_str(), outcome)
            }
        })
        .buffer_unordered(concurrency);

    let mut summary = RunSummary::default();
    let mut current = Snapshot::default();
    let mut failed_slugs: HashSet<String> = HashSet::new();

    while let Some((slug, outcome)) = outcomes.next().await {
        summary.skipped_records += outcome.skipped_records;
        match outcome.failure {
            None => {
                summary.sources_ok += 1;
                log::info!(
                    "[{}] {} listings ({} records skipped)",
                    slug,
                    outcome.listings.len(),
                    outcome.skipped_records
                );
            }
            Some(error) => {
                summary.sources_failed += 1;
                log::error!(
                    "[{}] feed failed after {} listings: {}",
                    slug,
                    outcome.listings.len(),
                    error
                );
                failed_slugs.insert(slug.to_string());
                summary.failures.push((slug.to_string(), error));
            }
        }
        // Partial results from a failed source are still fresher than
        // anything carried forward from the previous snapshot.
        current.merge(outcome.listings);
    }

    let previous = storage.load().await;
    let first_run = previous.is_empty();

    // A failed source keeps its previously known listings so a one-run
    // outage does not drop state. Keys it did manage to fetch this run
    // are excluded: the fresh listing wins over the carried one.
    if config.diff.carry_forward_failed && !failed_slugs.is_empty() {
        let carried: Vec<Listing> = previous
            .listings()
            .filter(|l| failed_slugs.contains(&l.source) && current.get(&l.key()).is_none())
            .cloned()
            .collect();
        if !carried.is_empty() {
            log::warn!(
                "Carrying forward {} listings from {} failed source(s)",
                carried.len(),
                failed_slugs.len()
            );
            current.merge(carried);
        }
    }

    let engine = DiffEngine::new(DiffOptions {
        alert_on_increase: config.diff.alert_on_increase,
        report_removed: config.diff.report_removed,
    });
    let changes = engine.diff(&current, &previous);

    summary.listing_count = current.len();
    summary.new_count = changes.new_listings.len();
    summary.changed_count = changes.changed.len();
    summary.removed_count = changes.removed.len();

    dispatch_outputs(config, &changes, &current, first_run).await;

    // Persist once, after all merging. This is the only run-level
    // failure point.
    storage.save(&current).await?;

    log::info!(
        "Run complete: {}/{} sources ok, {} listings, {} new, {} changed",
        summary.sources_ok,
        config.sources.len(),
        summary.listing_count,
        summary.new_count,
        summary.changed_count
    );

    Ok(summary)
}

/// Hand the change set to the export and notification collaborators.
/// Their failures are logged and never roll back the pipeline.
async fn dispatch_outputs(config: &Config, changes: &ChangeSet, current: &Snapshot, first_run: bool) {
    if config.export.enabled {
        let exporter = Exporter::new(&config.export);
        if let Err(e) = exporter.write(changes, current, first_run).await {
            log::warn!("Export failed: {}", e);
        }
        if let Err(e) = exporter.prune_old().await {
            log::warn!("Export pruning failed: {}", e);
        }
    }

    if config.notify.enabled && changes.has_changes() {
        let notifier = Notifier::new(&config.notify);
        notifier.send_changes(changes).await;
    }
}
