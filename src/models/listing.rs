//! Canonical listing data structure.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized listing, independent of the source schema it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    /// Slug of the source this listing was fetched from
    pub source: String,

    /// Upstream identifier, stable across polls for the same physical listing
    pub id: String,

    /// Display name (e.g. "Maruti Swift VXI")
    pub name: String,

    /// Asking price as an integer, never a formatted string
    pub price: i64,

    /// Secondary descriptive attributes (fuel, year, variant, mileage, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// When this listing was fetched. Volatile; excluded from diff equality.
    pub fetched_at: DateTime<Utc>,
}

impl Listing {
    /// Composite snapshot key. Sources may reuse numeric ids, so the
    /// slug is always part of the key.
    pub fn key(&self) -> String {
        format!("{}:{}", self.source, self.id)
    }

    /// Equality over the stable subset of fields only.
    ///
    /// `fetched_at` changes on every poll and must never make two
    /// otherwise-identical listings compare unequal.
    pub fn same_stable_fields(&self, other: &Listing) -> bool {
        self.source == other.source
            && self.id == other.id
            && self.name == other.name
            && self.price == other.price
            && self.attributes == other.attributes
    }
}
