//! Local filesystem snapshot storage.
//!
//! Writes are atomic from a concurrent reader's perspective: the
//! document is written to a temporary sibling file and renamed into
//! place, so a crash mid-write never leaves a truncated file visible
//! to the next load.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::storage::{Snapshot, SnapshotData, SnapshotDocument, SnapshotStorage};

/// Snapshot store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Create a store writing to the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure the parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStorage for LocalStorage {
    async fn load(&self) -> Snapshot {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No snapshot at {}, starting empty", self.path.display());
                return Snapshot::default();
            }
            Err(e) => {
                log::warn!(
                    "Snapshot read failed at {}: {}. Treating as empty.",
                    self.path.display(),
                    e
                );
                return Snapshot::default();
            }
        };

        if bytes.is_empty() {
            log::warn!("Snapshot at {} is empty", self.path.display());
            return Snapshot::default();
        }

        match serde_json::from_slice::<SnapshotDocument>(&bytes) {
            Ok(doc) => doc.into(),
            Err(e) => {
                log::warn!(
                    "Snapshot parse failed at {}: {}. Treating as empty; all current listings will classify as new.",
                    self.path.display(),
                    e
                );
                Snapshot::default()
            }
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let document = SnapshotData::new(snapshot);
        let bytes = serde_json::to_vec_pretty(&document)?;
        self.write_bytes(&bytes).await?;
        log::info!(
            "Snapshot saved: {} listings to {}",
            document.count,
            self.path.display()
        );
        Ok(())
    }
}
