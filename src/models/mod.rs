// src/models/mod.rs

//! Domain models for the watcher application.

mod config;
mod listing;
mod source;

// Re-export all public types
pub use config::{Config, CrawlerConfig, DiffConfig, ExportConfig, NotifyConfig, StorageConfig};
pub use listing::Listing;
pub use source::{FieldMap, PaginationMode, SourceConfig};
