//! Snapshot store: pre-change captures with integrity-checked rollback.

use std::path::PathBuf;

use tokio::fs;
use tokio::sync::Mutex;
use tracing::{error, info};

use patchforge_core::types::now_millis;
use patchforge_core::{PatchError, SnapshotMeta, SnapshotRecord};

use crate::fsio::{ensure_private_dir, resolve_contained, write_atomic};
use crate::integrity::{is_valid_record_id, new_record_id, sha256_hex};
use crate::patches::list_record_ids;

/// Source files above this size are refused for snapshotting.
pub const MAX_SNAPSHOT_BYTES: usize = 10 * 1024 * 1024;

pub struct SnapshotStore {
    /// Workspace root; every snapshot and rollback target must resolve
    /// inside it.
    root: PathBuf,
    dir: PathBuf,
    write_gate: Mutex<()>,
}

impl SnapshotStore {
    pub async fn open(
        root: impl Into<PathBuf>,
        dir: impl Into<PathBuf>,
    ) -> Result<Self, PatchError> {
        let dir = dir.into();
        ensure_private_dir(&dir).await?;
        Ok(Self {
            root: root.into(),
            dir,
            write_gate: Mutex::new(()),
        })
    }

    /// Capture the current content of `requested` (missing file reads as
    /// empty) and persist it as an addressable snapshot record.
    pub async fn create(&self, requested: &str) -> Result<SnapshotRecord, PatchError> {
        let resolved = resolve_contained(&self.root, requested)?;

        let original_content = match fs::read_to_string(&resolved).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(PatchError::StorageIo(err)),
        };

        if original_content.len() > MAX_SNAPSHOT_BYTES {
            return Err(PatchError::InputTooLarge {
                size: original_content.len(),
                limit: MAX_SNAPSHOT_BYTES,
            });
        }

        let record = SnapshotRecord {
            id: new_record_id("rollback"),
            file: requested.to_string(),
            resolved_path: resolved.display().to_string(),
            checksum: sha256_hex(original_content.as_bytes()),
            original_content,
            created_at: now_millis(),
        };

        let json = serde_json::to_vec_pretty(&record)?;
        let _gate = self.write_gate.lock().await;
        write_atomic(&self.dir.join(&record.id), &json).await?;

        info!(snapshot_id = %record.id, file = %record.file, "snapshot created");
        Ok(record)
    }

    /// Restore the snapshotted content over the target file. The checksum
    /// is recomputed over the stored content first; on mismatch the
    /// operation aborts without touching the target, and the corrupt
    /// record is retained for audit.
    pub async fn rollback(&self, id: &str) -> Result<String, PatchError> {
        let record = self.load(id).await?;
        let resolved = resolve_contained(&self.root, &record.file)?;

        if sha256_hex(record.original_content.as_bytes()) != record.checksum {
            error!(snapshot_id = %id, "snapshot checksum mismatch; rollback aborted");
            return Err(PatchError::IntegrityFailure(
                "snapshot content does not match its stored checksum".to_string(),
            ));
        }

        let _gate = self.write_gate.lock().await;
        write_atomic(&resolved, record.original_content.as_bytes()).await?;

        info!(snapshot_id = %id, file = %record.file, "rollback applied");
        Ok(record.file)
    }

    /// Metadata for every stored snapshot. Raw content is withheld by
    /// construction, not by caller trust. Unreadable records are skipped.
    pub async fn list(&self) -> Result<Vec<SnapshotMeta>, PatchError> {
        let mut metas = Vec::new();
        for id in list_record_ids(&self.dir, "rollback").await? {
            match self.load(&id).await {
                Ok(record) => metas.push(SnapshotMeta::from(&record)),
                Err(_) => continue,
            }
        }
        Ok(metas)
    }

    async fn load(&self, id: &str) -> Result<SnapshotRecord, PatchError> {
        if !is_valid_record_id(id, "rollback") {
            return Err(PatchError::NotFound(id.to_string()));
        }
        let raw = match fs::read_to_string(self.dir.join(id)).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PatchError::NotFound(id.to_string()))
            }
            Err(err) => return Err(PatchError::StorageIo(err)),
        };
        Ok(serde_json::from_str(&raw)?)
    }
}
