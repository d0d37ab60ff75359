use std::path::{Path, PathBuf};
use crate::error::{Error, Result};
use crate::event_log::snapshot::LedgerSnapshot;
use tokio::fs as async_fs;

/// Persists [`LedgerSnapshot`]s.
///
/// ## Format
/// - **Serialization**: `bincode`
/// - **Checksum**: SHA-256 over the ledger state, verified on load
/// - **Naming**: `snapshot_{last_event_sequence:020}.bin`, so lexical order is sequence order
///
/// ## Retention
/// Oldest files are deleted after each save once more than `max_snapshots` exist.
///
/// ## Atomicity
/// Data is written to a `.tmp` file and renamed into place.
pub struct SnapshotManager {
    snapshot_dir: PathBuf,
    max_snapshots: usize,
}

impl SnapshotManager {
    pub fn new(snapshot_dir: impl AsRef<Path>, max_snapshots: usize) -> Self {
        SnapshotManager {
            snapshot_dir: snapshot_dir.as_ref().to_path_buf(),
            max_snapshots: max_snapshots.max(1),
        }
    }

    pub async fn save_snapshot(&self, snapshot: &LedgerSnapshot) -> Result<PathBuf> {
        async_fs::create_dir_all(&self.snapshot_dir).await?;

        let filename = format!("snapshot_{:020}.bin", snapshot.last_event_sequence);
        let filepath = self.snapshot_dir.join(filename);
        let tmp_path = filepath.with_extension("tmp");

        let data = bincode::serialize(snapshot)
            .map_err(|e| Error::SerializationError(e.to_string()))?;

        async_fs::write(&tmp_path, data).await?;
        async_fs::rename(&tmp_path, &filepath).await?;

        tracing::info!(
            "Saved snapshot to {:?}: {} positions, sequence {}",
            filepath,
            snapshot.positions.len(),
            snapshot.last_event_sequence
        );

        self.cleanup_old_snapshots().await?;
        Ok(filepath)
    }

    pub async fn load_latest(&self) -> Result<LedgerSnapshot> {
        let snapshots = self.list_snapshots().await?;
        let latest = snapshots.last().ok_or(Error::NoSnapshotFound)?;
        self.load_snapshot(latest).await
    }

    pub async fn load_snapshot(&self, filepath: &Path) -> Result<LedgerSnapshot> {
        let data = async_fs::read(filepath).await?;

        let snapshot: LedgerSnapshot = bincode::deserialize(&data)
            .map_err(|e| Error::SerializationError(e.to_string()))?;

        if snapshot.version > crate::SNAPSHOT_VERSION {
            return Err(Error::UnsupportedSnapshotVersion {
                found: snapshot.version,
                max_supported: crate::SNAPSHOT_VERSION,
            });
        }

        if !snapshot.verify_checksum() {
            tracing::error!("Snapshot checksum mismatch: {:?}", filepath);
            return Err(Error::InvalidChecksum);
        }

        tracing::info!("Loaded snapshot from {:?}", filepath);
        Ok(snapshot)
    }

    /// Snapshot files sorted oldest first.
    async fn list_snapshots(&self) -> Result<Vec<PathBuf>> {
        let mut snapshots = Vec::new();

        let mut entries = match async_fs::read_dir(&self.snapshot_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(snapshots),
            Err(e) => return Err(Error::IoError(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_snapshot = path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with("snapshot_") && name.ends_with(".bin"));
            if is_snapshot {
                snapshots.push(path);
            }
        }

        snapshots.sort();
        Ok(snapshots)
    }

    async fn cleanup_old_snapshots(&self) -> Result<()> {
        let snapshots = self.list_snapshots().await?;

        if snapshots.len() <= self.max_snapshots {
            return Ok(());
        }

        let to_delete = snapshots.len() - self.max_snapshots;
        for snapshot_path in snapshots.iter().take(to_delete) {
            async_fs::remove_file(snapshot_path).await?;
            tracing::info!("Deleted old snapshot: {:?}", snapshot_path);
        }

        Ok(())
    }
}
