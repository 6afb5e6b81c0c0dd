//! Application configuration structures.
//!
//! The configuration is loaded once at process start and passed by
//! reference into the pipeline; no component reads ambient process
//! state directly.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{PaginationMode, SourceConfig};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Change classification policy
    #[serde(default)]
    pub diff: DiffConfig,

    /// Snapshot persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Table export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Notification settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Upstream catalog feeds
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.sources.is_empty() {
            return Err(AppError::validation("No sources defined"));
        }

        let mut seen_slugs = std::collections::HashSet::new();
        for source in &self.sources {
            if source.slug.trim().is_empty() {
                return Err(AppError::validation("source slug is empty"));
            }
            if !seen_slugs.insert(source.slug.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate source slug '{}'",
                    source.slug
                )));
            }
            url::Url::parse(&source.endpoint)?;
            if source.page_size == 0 {
                return Err(AppError::validation(format!(
                    "source '{}': page_size must be > 0",
                    source.slug
                )));
            }
            if source.records_path.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "source '{}': records_path is empty",
                    source.slug
                )));
            }
            if source.fields.id.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "source '{}': fields.id is empty",
                    source.slug
                )));
            }
            // A mismatched mode/request-shape pair would refetch the
            // first page forever: cursor modes need a body to echo the
            // cursor into, page numbering travels in query parameters.
            match (&source.mode, &source.body) {
                (PaginationMode::PageNumber { .. }, Some(_)) => {
                    return Err(AppError::validation(format!(
                        "source '{}': page_number mode must not use a request body",
                        source.slug
                    )));
                }
                (PaginationMode::Cursor { .. } | PaginationMode::ScoreId { .. }, None) => {
                    return Err(AppError::validation(format!(
                        "source '{}': cursor pagination requires a request body",
                        source.slug
                    )));
                }
                _ => {}
            }
        }

        if self.notify.enabled && self.notify.chat_ids.is_empty() {
            return Err(AppError::validation(
                "notify.enabled but no chat_ids configured",
            ));
        }

        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between page requests in milliseconds (politeness to the
    /// upstream; not correctness-critical)
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum sources crawled concurrently
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Safety cap on pages per source; 0 means unlimited
    #[serde(default)]
    pub max_pages: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
            max_pages: 0,
        }
    }
}

/// Change classification policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Report price increases as changes (default: decreases only)
    #[serde(default)]
    pub alert_on_increase: bool,

    /// Report listings that disappeared since the previous run
    #[serde(default)]
    pub report_removed: bool,

    /// Carry a fully-failed source's previous listings into the new
    /// snapshot instead of dropping them
    #[serde(default = "defaults::carry_forward")]
    pub carry_forward_failed: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            alert_on_increase: false,
            report_removed: false,
            carry_forward_failed: defaults::carry_forward(),
        }
    }
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the snapshot file
    #[serde(default = "defaults::snapshot_path")]
    pub snapshot_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: defaults::snapshot_path(),
        }
    }
}

/// Table export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Whether exports are written at all
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Directory export files are written into
    #[serde(default = "defaults::export_dir")]
    pub output_dir: String,

    /// Exports older than this many days are pruned; 0 disables pruning
    #[serde(default = "defaults::retention_days")]
    pub retention_days: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            output_dir: defaults::export_dir(),
            retention_days: defaults::retention_days(),
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Whether notifications are sent at all
    #[serde(default)]
    pub enabled: bool,

    /// Bot token. May be left empty in the file and supplied via the
    /// LOTWATCH_BOT_TOKEN environment variable at the CLI boundary.
    #[serde(default)]
    pub token: String,

    /// Recipient chat ids
    #[serde(default)]
    pub chat_ids: Vec<String>,

    /// Maximum listings rendered per message before the
    /// "...and N more" marker
    #[serde(default = "defaults::max_items")]
    pub max_items: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: String::new(),
            chat_ids: Vec::new(),
            max_items: defaults::max_items(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; lotwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        500
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Diff defaults
    pub fn carry_forward() -> bool {
        true
    }

    // Storage defaults
    pub fn snapshot_path() -> String {
        "data/snapshot.json".into()
    }

    // Export defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn export_dir() -> String {
        "exports".into()
    }
    pub fn retention_days() -> u64 {
        30
    }

    // Notify defaults
    pub fn max_items() -> usize {
        10
    }
}
