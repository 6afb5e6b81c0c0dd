//! Tabular export of detected changes.
//!
//! Writes date-stamped CSV tables next to the snapshot: one for new
//! listings, one for price changes, and the full listing set on the
//! first run. Old exports are pruned past the retention window.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use chrono::Utc;

use crate::error::Result;
use crate::models::{ExportConfig, Listing};
use crate::pipeline::{ChangeSet, Direction, PriceChange};
use crate::storage::Snapshot;

/// CSV table writer for one export directory.
pub struct Exporter {
    dir: PathBuf,
    retention_days: u64,
}

impl Exporter {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.output_dir),
            retention_days: config.retention_days,
        }
    }

    /// Write the tables for one run. Returns the files written.
    ///
    /// Nothing is written when there are no changes, except on the
    /// first run where the full current set is exported.
    pub async fn write(
        &self,
        changes: &ChangeSet,
        snapshot: &Snapshot,
        first_run: bool,
    ) -> Result<Vec<PathBuf>> {
        if !changes.has_changes() && !first_run {
            log::info!("No changes, skipping export");
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let date = Utc::now().format("%Y-%m-%d");
        let mut written = Vec::new();

        if first_run {
            let all: Vec<&Listing> = snapshot.listings().collect();
            let path = self.dir.join(format!("lotwatch_{}_all.csv", date));
            tokio::fs::write(&path, listing_table(&all)).await?;
            log::info!("Exported full set ({} listings) to {}", all.len(), path.display());
            written.push(path);
            return Ok(written);
        }

        if !changes.new_listings.is_empty() {
            let rows: Vec<&Listing> = changes.new_listings.iter().collect();
            let path = self.dir.join(format!("lotwatch_{}_new.csv", date));
            tokio::fs::write(&path, listing_table(&rows)).await?;
            log::info!("Exported {} new listings to {}", rows.len(), path.display());
            written.push(path);
        }

        if !changes.changed.is_empty() {
            let path = self.dir.join(format!("lotwatch_{}_changed.csv", date));
            tokio::fs::write(&path, change_table(&changes.changed)).await?;
            log::info!(
                "Exported {} price changes to {}",
                changes.changed.len(),
                path.display()
            );
            written.push(path);
        }

        Ok(written)
    }

    /// Delete export files older than the retention window.
    pub async fn prune_old(&self) -> Result<usize> {
        if self.retention_days == 0 {
            return Ok(0);
        }

        let cutoff = SystemTime::now() - Duration::from_secs(self.retention_days * 24 * 3600);
        let mut removed = 0usize;

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            if modified < cutoff {
                tokio::fs::remove_file(&path).await?;
                log::info!("Pruned old export {}", path.display());
                removed += 1;
            }
        }

        Ok(removed)
    }
}

/// Render listings as CSV with a union of all attribute columns.
fn listing_table(listings: &[&Listing]) -> String {
    let attr_columns: BTreeSet<&str> = listings
        .iter()
        .flat_map(|l| l.attributes.keys().map(String::as_str))
        .collect();

    let mut header: Vec<&str> = vec!["source", "id", "name", "price"];
    header.extend(attr_columns.iter().copied());

    let mut out = csv_row(&header);
    for listing in listings {
        let mut row: Vec<&str> = vec![&listing.source, &listing.id, &listing.name];
        let price = listing.price.to_string();
        row.push(&price);
        for column in &attr_columns {
            row.push(listing.attributes.get(*column).map_or("", String::as_str));
        }
        out.push_str(&csv_row(&row));
    }
    out
}

/// Render price changes as CSV.
fn change_table(changes: &[PriceChange]) -> String {
    let mut out = csv_row(&[
        "source",
        "id",
        "name",
        "previous_price",
        "current_price",
        "direction",
        "percent",
    ]);

    for change in changes {
        let previous = change.previous_price.to_string();
        let current = change.current_price.to_string();
        let direction = match change.direction {
            Direction::Decreased => "decreased",
            Direction::Increased => "increased",
        };
        let percent = change
            .percent_change()
            .map(|p| p.to_string())
            .unwrap_or_default();
        out.push_str(&csv_row(&[
            &change.listing.source,
            &change.listing.id,
            &change.listing.name,
            &previous,
            &current,
            direction,
            &percent,
        ]));
    }
    out
}

fn csv_row(fields: &[&str]) -> String {
    let mut row = fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}

/// Quote a field when it contains a delimiter, quote, or newline.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn make_listing(id: &str, name: &str, price: i64) -> Listing {
        Listing {
            source: "spinny".to_string(),
            id: id.to_string(),
            name: name.to_string(),
            price,
            attributes: BTreeMap::from([("fuel".to_string(), "Petrol".to_string())]),
            fetched_at: Utc::now(),
        }
    }

    fn exporter(tmp: &TempDir) -> Exporter {
        Exporter::new(&ExportConfig {
            enabled: true,
            output_dir: tmp.path().to_string_lossy().into_owned(),
            retention_days: 30,
        })
    }

    #[test]
    fn test_csv_field_escaping() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_listing_table_has_attribute_columns() {
        let listing = make_listing("1", "Swift, VXI", 550_000);
        let table = listing_table(&[&listing]);

        let mut lines = table.lines();
        assert_eq!(lines.next().unwrap(), "source,id,name,price,fuel");
        assert_eq!(lines.next().unwrap(), "spinny,1,\"Swift, VXI\",550000,Petrol");
    }

    #[test]
    fn test_change_table_rows() {
        let changes = vec![PriceChange {
            listing: make_listing("1", "Swift", 450_000),
            previous_price: 500_000,
            current_price: 450_000,
            direction: Direction::Decreased,
        }];
        let table = change_table(&changes);
        assert!(table.contains("spinny,1,Swift,500000,450000,decreased,10"));
    }

    #[tokio::test]
    async fn test_no_changes_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let written = exporter(&tmp)
            .write(&ChangeSet::default(), &Snapshot::default(), false)
            .await
            .unwrap();
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_first_run_exports_full_set() {
        let tmp = TempDir::new().unwrap();
        let snapshot: Snapshot = vec![make_listing("1", "Swift", 550_000)]
            .into_iter()
            .collect();

        let written = exporter(&tmp)
            .write(&ChangeSet::default(), &snapshot, true)
            .await
            .unwrap();

        assert_eq!(written.len(), 1);
        let content = std::fs::read_to_string(&written[0]).unwrap();
        assert!(content.contains("Swift"));
    }

    #[tokio::test]
    async fn test_changes_export_two_tables() {
        let tmp = TempDir::new().unwrap();
        let changes = ChangeSet {
            new_listings: vec![make_listing("2", "Baleno", 600_000)],
            changed: vec![PriceChange {
                listing: make_listing("1", "Swift", 450_000),
                previous_price: 500_000,
                current_price: 450_000,
                direction: Direction::Decreased,
            }],
            removed: Vec::new(),
        };

        let written = exporter(&tmp)
            .write(&changes, &Snapshot::default(), false)
            .await
            .unwrap();
        assert_eq!(written.len(), 2);
    }

    #[tokio::test]
    async fn test_prune_missing_dir_is_noop() {
        let tmp = TempDir::new().unwrap();
        let exporter = Exporter::new(&ExportConfig {
            enabled: true,
            output_dir: tmp
                .path()
                .join("does-not-exist")
                .to_string_lossy()
                .into_owned(),
            retention_days: 7,
        });
        assert_eq!(exporter.prune_old().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prune_keeps_recent_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("lotwatch_recent_new.csv"), "a,b\n").unwrap();
        assert_eq!(exporter(&tmp).prune_old().await.unwrap(), 0);
        assert!(tmp.path().join("lotwatch_recent_new.csv").exists());
    }
}
