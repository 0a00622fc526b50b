//! Durable storage for staged patch records, one JSON file per record.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

use patchforge_core::{PatchError, PatchRecord};

use crate::fsio::{ensure_private_dir, write_atomic};
use crate::integrity::is_valid_record_id;

/// One store instance per record directory. Writes through the same
/// instance are serialized on `write_gate`; atomic rename makes records
/// all-or-nothing for readers.
pub struct PatchStore {
    dir: PathBuf,
    write_gate: Mutex<()>,
}

impl PatchStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, PatchError> {
        let dir = dir.into();
        ensure_private_dir(&dir).await?;
        Ok(Self {
            dir,
            write_gate: Mutex::new(()),
        })
    }

    /// Persist a staged patch record. The record is immutable once written.
    pub async fn create(&self, record: &PatchRecord) -> Result<PathBuf, PatchError> {
        let json = serde_json::to_vec_pretty(record)?;
        let path = self.dir.join(&record.id);

        let _gate = self.write_gate.lock().await;
        write_atomic(&path, &json).await?;

        info!(patch_id = %record.id, file = %record.file, "patch record persisted");
        Ok(path)
    }

    pub async fn load(&self, id: &str) -> Result<PatchRecord, PatchError> {
        let path = self.record_path(id)?;
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PatchError::NotFound(id.to_string()))
            }
            Err(err) => return Err(PatchError::StorageIo(err)),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    /// Remove a record after terminal disposition (applied or rejected).
    pub async fn remove(&self, id: &str) -> Result<(), PatchError> {
        let path = self.record_path(id)?;
        let _gate = self.write_gate.lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(patch_id = %id, "patch record removed");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(PatchError::NotFound(id.to_string()))
            }
            Err(err) => Err(PatchError::StorageIo(err)),
        }
    }

    /// Ids of all staged records. Temp files and foreign names are skipped,
    /// so readers never observe an in-flight write.
    pub async fn list(&self) -> Result<Vec<String>, PatchError> {
        list_record_ids(&self.dir, "patch").await
    }

    fn record_path(&self, id: &str) -> Result<PathBuf, PatchError> {
        if !is_valid_record_id(id, "patch") {
            return Err(PatchError::NotFound(id.to_string()));
        }
        Ok(self.dir.join(id))
    }
}

pub(crate) async fn list_record_ids(dir: &Path, prefix: &str) -> Result<Vec<String>, PatchError> {
    let mut entries = fs::read_dir(dir).await.map_err(PatchError::StorageIo)?;
    let mut ids = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(PatchError::StorageIo)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_valid_record_id(&name, prefix) {
            ids.push(name);
        }
    }
    ids.sort();
    Ok(ids)
}
