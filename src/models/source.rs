//! Per-source feed configuration.
//!
//! Each upstream catalog exposes its own pagination scheme and record
//! schema. Both are declared as plain data here so adding a source is a
//! config change, not a code change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Configuration for one upstream catalog feed.
///
/// Request shape: a source with a `body` template is fetched via POST
/// (the pagination cursor is injected into the body); a source without
/// one is fetched via GET with `query` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique slug identifying this source (part of every listing key)
    pub slug: String,

    /// Base endpoint URL
    pub endpoint: String,

    /// Pagination scheme
    pub mode: PaginationMode,

    /// Query parameters for GET sources
    #[serde(default)]
    pub query: BTreeMap<String, String>,

    /// JSON body template for POST sources
    #[serde(default)]
    pub body: Option<serde_json::Value>,

    /// Page size requested from the upstream
    #[serde(default = "defaults::page_size")]
    pub page_size: u64,

    /// Key of the records array in the response (e.g. "content", "results")
    pub records_path: String,

    /// Field resolution rules mapping raw records to canonical listings
    pub fields: FieldMap,
}

/// How a source paginates its result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationMode {
    /// The response carries an opaque token that is echoed back in the
    /// next request body.
    Cursor {
        /// Response key holding the token
        response_field: String,
        /// Body key the token is injected under
        request_field: String,
    },

    /// The next request is built from the last record of the current
    /// page: a `[score, id]` tuple injected into the request body.
    ScoreId {
        /// Record field holding the ranking score
        score_field: String,
        /// Record field holding the identity
        id_field: String,
        /// Body key the tuple is injected under
        request_field: String,
    },

    /// Classic page numbering via a query parameter. A non-null flag in
    /// the response signals that more pages exist.
    PageNumber {
        /// Query parameter carrying the page number
        page_param: String,
        /// Response key whose presence means "more pages"
        next_field: String,
    },
}

/// Explicit per-source field resolution.
///
/// Paths are dot-separated and may reach into nested objects
/// (e.g. `odometer.display`). Missing text fields default to the empty
/// string; a missing price defaults to 0. Only the `id` field is
/// mandatory on every record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMap {
    /// Path to the record identity (required on every record)
    pub id: String,

    /// Paths composing the display name, joined with a space
    /// (some sources split it into make + model)
    pub name: Vec<String>,

    /// Path to the price value
    pub price: String,

    /// Canonical attribute name -> path for secondary fields
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

mod defaults {
    pub fn page_size() -> u64 {
        40
    }
}
