//! Change classification between two snapshots.
//!
//! Compares the freshly merged snapshot against the previously persisted
//! one and classifies every current listing as New, Changed (price
//! delta), or implicitly Unchanged. Whether price increases count as
//! changes, and whether delisted entries are reported, are policy
//! options rather than hardwired rules.

use serde::{Deserialize, Serialize};

use crate::models::Listing;
use crate::storage::Snapshot;

/// Direction of a price change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Decreased,
    Increased,
}

/// One detected price change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChange {
    pub listing: Listing,
    pub previous_price: i64,
    pub current_price: i64,
    pub direction: Direction,
}

impl PriceChange {
    /// Percentage drop relative to the previous price, rounded.
    ///
    /// `None` when the previous price was 0 (undefined rather than a
    /// division by zero). Increases yield a negative value.
    pub fn percent_change(&self) -> Option<i64> {
        if self.previous_price == 0 {
            return None;
        }
        let delta = (self.previous_price - self.current_price) as f64;
        Some((delta / self.previous_price as f64 * 100.0).round() as i64)
    }
}

/// Result of one diff. Unchanged listings are implicit (absent from
/// every list).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChangeSet {
    /// Listings absent from the previous snapshot
    pub new_listings: Vec<Listing>,

    /// Listings whose price moved
    pub changed: Vec<PriceChange>,

    /// Listings that disappeared since the previous run.
    /// Populated only when removed-reporting is enabled.
    pub removed: Vec<Listing>,
}

impl ChangeSet {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.new_listings.is_empty() || !self.changed.is_empty() || !self.removed.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.new_listings.len() + self.changed.len() + self.removed.len()
    }
}

/// Change-classification policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    /// Classify price increases as Changed (default: decreases only)
    pub alert_on_increase: bool,

    /// Report listings present before but absent now
    pub report_removed: bool,
}

/// Classifier comparing a current snapshot against the previous one.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    options: DiffOptions,
}

impl DiffEngine {
    /// Create a diff engine with the given policy.
    pub fn new(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Classify `current` against `previous`.
    pub fn diff(&self, current: &Snapshot, previous: &Snapshot) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (key, listing) in current.iter() {
            let Some(prev) = previous.get(key) else {
                changes.new_listings.push(listing.clone());
                continue;
            };

            if listing.price == prev.price {
                continue;
            }

            let direction = if listing.price < prev.price {
                Direction::Decreased
            } else {
                Direction::Increased
            };
            if direction == Direction::Increased && !self.options.alert_on_increase {
                continue;
            }

            changes.changed.push(PriceChange {
                listing: listing.clone(),
                previous_price: prev.price,
                current_price: listing.price,
                direction,
            });
        }

        if self.options.report_removed {
            for (key, listing) in previous.iter() {
                if current.get(key).is_none() {
                    changes.removed.push(listing.clone());
                }
            }
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn make_listing(source: &str, id: &str, price: i64) -> Listing {
        Listing {
            source: source.to_string(),
            id: id.to_string(),
            name: format!("Car {}", id),
            price,
            attributes: BTreeMap::new(),
            fetched_at: Utc::now(),
        }
    }

    fn snapshot_of(listings: Vec<Listing>) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for listing in listings {
            snapshot.insert(listing);
        }
        snapshot
    }

    fn engine() -> DiffEngine {
        DiffEngine::default()
    }

    #[test]
    fn test_identical_snapshots_yield_empty_changeset() {
        let current = snapshot_of(vec![
            make_listing("spinny", "1", 500_000),
            make_listing("spinny", "2", 300_000),
        ]);
        // Fresh fetch stamps differ but stable fields match.
        let previous = snapshot_of(vec![
            make_listing("spinny", "1", 500_000),
            make_listing("spinny", "2", 300_000),
        ]);

        let changes = engine().diff(&current, &previous);
        assert!(!changes.has_changes());
        assert_eq!(changes.change_count(), 0);
    }

    #[test]
    fn test_new_listing_appears_exactly_once() {
        let current = snapshot_of(vec![
            make_listing("spinny", "1", 500_000),
            make_listing("spinny", "2", 300_000),
        ]);
        let previous = snapshot_of(vec![make_listing("spinny", "1", 500_000)]);

        let changes = engine().diff(&current, &previous);
        assert_eq!(changes.new_listings.len(), 1);
        assert_eq!(changes.new_listings[0].id, "2");
        assert!(changes.changed.is_empty());
    }

    #[test]
    fn test_price_drop_classified_with_percentage() {
        let current = snapshot_of(vec![make_listing("spinny", "1", 450_000)]);
        let previous = snapshot_of(vec![make_listing("spinny", "1", 500_000)]);

        let changes = engine().diff(&current, &previous);
        assert_eq!(changes.changed.len(), 1);

        let change = &changes.changed[0];
        assert_eq!(change.previous_price, 500_000);
        assert_eq!(change.current_price, 450_000);
        assert_eq!(change.direction, Direction::Decreased);
        assert_eq!(change.percent_change(), Some(10));
    }

    #[test]
    fn test_increase_suppressed_by_default() {
        let current = snapshot_of(vec![make_listing("spinny", "1", 550_000)]);
        let previous = snapshot_of(vec![make_listing("spinny", "1", 500_000)]);

        let changes = engine().diff(&current, &previous);
        assert!(!changes.has_changes());
    }

    #[test]
    fn test_increase_reported_when_enabled() {
        let engine = DiffEngine::new(DiffOptions {
            alert_on_increase: true,
            ..Default::default()
        });
        let current = snapshot_of(vec![make_listing("spinny", "1", 550_000)]);
        let previous = snapshot_of(vec![make_listing("spinny", "1", 500_000)]);

        let changes = engine.diff(&current, &previous);
        assert_eq!(changes.changed.len(), 1);
        assert_eq!(changes.changed[0].direction, Direction::Increased);
        assert_eq!(changes.changed[0].percent_change(), Some(-10));
    }

    #[test]
    fn test_zero_previous_price_has_no_percentage() {
        let current = snapshot_of(vec![make_listing("spinny", "1", 100_000)]);
        let previous = snapshot_of(vec![make_listing("spinny", "1", 0)]);

        let changes = engine().diff(&current, &previous);
        // 0 -> 100_000 is an increase, suppressed by default policy
        assert!(changes.changed.is_empty());

        let engine = DiffEngine::new(DiffOptions {
            alert_on_increase: true,
            ..Default::default()
        });
        let changes = engine.diff(&current, &previous);
        assert_eq!(changes.changed[0].percent_change(), None);
    }

    #[test]
    fn test_removed_not_reported_by_default() {
        let current = snapshot_of(vec![]);
        let previous = snapshot_of(vec![make_listing("spinny", "1", 500_000)]);

        let changes = engine().diff(&current, &previous);
        assert!(!changes.has_changes());
    }

    #[test]
    fn test_removed_reported_when_enabled() {
        let engine = DiffEngine::new(DiffOptions {
            report_removed: true,
            ..Default::default()
        });
        let current = snapshot_of(vec![make_listing("spinny", "1", 500_000)]);
        let previous = snapshot_of(vec![
            make_listing("spinny", "1", 500_000),
            make_listing("spinny", "2", 300_000),
        ]);

        let changes = engine.diff(&current, &previous);
        assert_eq!(changes.removed.len(), 1);
        assert_eq!(changes.removed[0].id, "2");
    }

    #[test]
    fn test_empty_previous_classifies_everything_new() {
        let current = snapshot_of(vec![
            make_listing("spinny", "1", 500_000),
            make_listing("cars24", "1", 400_000),
        ]);

        let changes = engine().diff(&current, &Snapshot::default());
        assert_eq!(changes.new_listings.len(), 2);
        assert!(changes.changed.is_empty());
    }

    #[test]
    fn test_same_id_across_sources_does_not_collide() {
        let current = snapshot_of(vec![
            make_listing("spinny", "1", 500_000),
            make_listing("cars24", "1", 400_000),
        ]);
        let previous = snapshot_of(vec![make_listing("spinny", "1", 500_000)]);

        let changes = engine().diff(&current, &previous);
        assert_eq!(changes.new_listings.len(), 1);
        assert_eq!(changes.new_listings[0].source, "cars24");
    }
}
