//! Snapshot persistence.
//!
//! The snapshot is the full set of listings observed at the end of the
//! most recent successful run, keyed by composite `source:id`. It is
//! replaced wholesale each run and must never be visible in a partially
//! written state.

pub mod local;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Listing;

// Re-export for convenience
pub use local::LocalStorage;

/// In-memory snapshot: composite key -> listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    listings: BTreeMap<String, Listing>,
}

impl Snapshot {
    /// Insert a listing under its composite key, returning any listing
    /// it replaced.
    pub fn insert(&mut self, listing: Listing) -> Option<Listing> {
        self.listings.insert(listing.key(), listing)
    }

    /// Look up a listing by composite key.
    pub fn get(&self, key: &str) -> Option<&Listing> {
        self.listings.get(key)
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Listing)> {
        self.listings.iter()
    }

    /// Iterate listings in key order.
    pub fn listings(&self) -> impl Iterator<Item = &Listing> {
        self.listings.values()
    }

    /// Merge listings into this snapshot. Later entries win on key
    /// collision, which cannot happen across distinct sources since the
    /// slug is part of every key.
    pub fn merge(&mut self, listings: impl IntoIterator<Item = Listing>) {
        for listing in listings {
            self.insert(listing);
        }
    }
}

impl FromIterator<Listing> for Snapshot {
    fn from_iter<T: IntoIterator<Item = Listing>>(iter: T) -> Self {
        let mut snapshot = Self::default();
        snapshot.merge(iter);
        snapshot
    }
}

/// On-disk snapshot document with a small header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotData {
    /// ISO 8601 timestamp of the write
    pub updated_at: DateTime<Utc>,
    /// Total listing count
    pub count: usize,
    /// The keyed listings mapping
    pub listings: BTreeMap<String, Listing>,
}

impl SnapshotData {
    pub fn new(snapshot: &Snapshot) -> Self {
        Self {
            updated_at: Utc::now(),
            count: snapshot.len(),
            listings: snapshot.listings.clone(),
        }
    }
}

/// Accepted on-disk shapes, newest first. Older deployments wrote a
/// bare keyed mapping, the oldest a plain sequence of listings;
/// both upconvert transparently on load.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SnapshotDocument {
    Headered(SnapshotData),
    Keyed(BTreeMap<String, Listing>),
    Legacy(Vec<Listing>),
}

impl From<SnapshotDocument> for Snapshot {
    fn from(doc: SnapshotDocument) -> Self {
        match doc {
            SnapshotDocument::Headered(data) => Snapshot {
                listings: data.listings,
            },
            SnapshotDocument::Keyed(listings) => Snapshot { listings },
            // Re-key the sequence by each listing's composite key
            SnapshotDocument::Legacy(listings) => listings.into_iter().collect(),
        }
    }
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Load the previous snapshot.
    ///
    /// An absent, empty, or unparseable backing store yields an empty
    /// snapshot (logged, never raised); every current listing then
    /// classifies as New on the next diff.
    async fn load(&self) -> Snapshot;

    /// Persist the full current snapshot atomically.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}
