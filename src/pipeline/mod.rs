//! The crawl-normalize-diff pipeline.
//!
//! - `walker`: drives one source's paginated feed to completion
//! - `normalize`: maps raw records into canonical listings
//! - `diff`: classifies the current snapshot against the previous one
//! - `crawl`: orchestrates all sources and the collaborators

pub mod crawl;
pub mod diff;
pub mod normalize;
pub mod walker;

pub use crawl::{RunSummary, SourceCrawler, run_watch};
pub use diff::{ChangeSet, DiffEngine, DiffOptions, Direction, PriceChange};
pub use normalize::RecordNormalizer;
pub use walker::{Cursor, Page, PageFetcher, PageWalker, WalkOutcome};
