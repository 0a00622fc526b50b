//! Builder orchestrator: sequences read → diff → validate → persist, and
//! owns the approve/apply and rollback flows against the stores.
//!
//! Boundary policy: pipeline functions return explicit outcome values so
//! the caller can make policy decisions without exception-driven control
//! flow. Internal faults are caught once here and converted to the same
//! outcome shape; stack detail never crosses this boundary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{error, info, warn};

use patchforge_core::types::now_millis;
use patchforge_core::{PatchError, PatchRecord, SandboxPreview, SnapshotMeta};
use patchforge_diff::{generate_diff, rebuild_modified};
use patchforge_store::{
    resolve_contained, sha256_hex, write_atomic, PatchStore, SnapshotStore, MAX_SNAPSHOT_BYTES,
};

use crate::validator;

const SCHEMA_VERSION: &str = "1.0";

/// Where the engine keeps its records, relative to the workspace root.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub workspace_root: PathBuf,
    pub patch_dir: PathBuf,
    pub rollback_dir: PathBuf,
}

impl BuilderConfig {
    /// Default layout: records live under `.patchforge/` inside the root.
    pub fn at_root(workspace_root: impl Into<PathBuf>) -> Self {
        let workspace_root = workspace_root.into();
        Self {
            patch_dir: workspace_root.join(".patchforge/patches"),
            rollback_dir: workspace_root.join(".patchforge/rollback"),
            workspace_root,
        }
    }
}

/// Caller-facing outcome of a patch proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOutcome {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PatchOutcome {
    fn staged(patch_id: String) -> Self {
        Self {
            accepted: true,
            patch_id: Some(patch_id),
            reason: None,
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            patch_id: None,
            reason: Some(reason.into()),
        }
    }
}

/// Result of approving and applying a staged patch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPatch {
    pub patch_id: String,
    pub file: String,
    /// Snapshot taken just before the write; the revert handle.
    pub snapshot_id: String,
}

/// Static build plan handed back to the caller before a patch is proposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub schema_version: String,
    pub title: String,
    pub intent: String,
    pub steps: Vec<String>,
    pub timestamp: i64,
}

pub struct BuilderEngine {
    root: PathBuf,
    patches: PatchStore,
    snapshots: SnapshotStore,
}

impl BuilderEngine {
    pub async fn open(config: BuilderConfig) -> Result<Self, PatchError> {
        let patches = PatchStore::open(&config.patch_dir).await?;
        let snapshots = SnapshotStore::open(&config.workspace_root, &config.rollback_dir).await?;
        Ok(Self {
            root: config.workspace_root,
            patches,
            snapshots,
        })
    }

    /// Propose a change: diff current content against `new_content`,
    /// validate, and stage a patch record. Nothing is written to the
    /// target file here.
    pub async fn create_patch(&self, file: &str, new_content: &str) -> PatchOutcome {
        match self.try_create_patch(file, new_content).await {
            Ok(outcome) => outcome,
            Err(PatchError::PathTraversal) => {
                warn!("patch proposal for a target outside the workspace root");
                PatchOutcome::rejected(PatchError::PathTraversal.to_string())
            }
            Err(err) => {
                error!(error = %err, "patch creation failed");
                PatchOutcome::rejected(err.to_string())
            }
        }
    }

    async fn try_create_patch(
        &self,
        file: &str,
        new_content: &str,
    ) -> Result<PatchOutcome, PatchError> {
        let resolved = resolve_contained(&self.root, file)?;
        let original = self.read_current(&resolved).await?;

        let diff = generate_diff(&original, new_content)?;
        let verdict = validator::validate(&diff);
        if !verdict.accepted {
            let reason = verdict
                .reason
                .unwrap_or_else(|| "patch rejected".to_string());
            info!(file = %file, reason = %reason, "patch rejected by validator");
            return Ok(PatchOutcome::rejected(reason));
        }

        let record = PatchRecord {
            schema_version: SCHEMA_VERSION.to_string(),
            id: patchforge_store::new_record_id("patch"),
            file: file.to_string(),
            target_path_digest: sha256_hex(resolved.display().to_string().as_bytes()),
            base_digest: sha256_hex(original.as_bytes()),
            diff,
            timestamp: now_millis(),
        };
        self.patches.create(&record).await?;

        info!(patch_id = %record.id, file = %file, "patch staged, awaiting approval");
        Ok(PatchOutcome::staged(record.id))
    }

    /// Approve and apply a staged patch.
    ///
    /// The stored base digest is re-verified against the file's current
    /// content; any drift fails closed. A snapshot of the current content
    /// is taken before the write, so every apply is revertible. The stored
    /// ops are replayed to rebuild the proposed content; with the digest
    /// check this is byte-equivalent to the content captured at proposal
    /// time.
    pub async fn apply_patch(&self, patch_id: &str) -> Result<AppliedPatch, PatchError> {
        let record = self.patches.load(patch_id).await?;
        let resolved = resolve_contained(&self.root, &record.file)?;

        let current = self.read_current(&resolved).await?;
        if sha256_hex(current.as_bytes()) != record.base_digest {
            error!(patch_id = %patch_id, "base content drifted since the patch was staged");
            return Err(PatchError::IntegrityFailure(
                "file changed since the patch was created".to_string(),
            ));
        }

        let snapshot = self.snapshots.create(&record.file).await?;

        let new_content = rebuild_modified(&record.diff.ops);
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent).await.map_err(PatchError::StorageIo)?;
        }
        write_atomic(&resolved, new_content.as_bytes()).await?;

        self.patches.remove(patch_id).await?;
        info!(patch_id = %patch_id, file = %record.file, "patch applied");

        Ok(AppliedPatch {
            patch_id: patch_id.to_string(),
            file: record.file,
            snapshot_id: snapshot.id,
        })
    }

    /// Discard a staged patch without applying it.
    pub async fn reject_patch(&self, patch_id: &str) -> Result<(), PatchError> {
        self.patches.remove(patch_id).await?;
        info!(patch_id = %patch_id, "patch rejected and discarded");
        Ok(())
    }

    /// Ids of all currently staged patches.
    pub async fn pending_patches(&self) -> Result<Vec<String>, PatchError> {
        self.patches.list().await
    }

    /// Render a sandboxed preview of untrusted HTML. Separate path from
    /// patch staging; nothing is persisted.
    pub fn generate_preview(&self, html: &str) -> Result<SandboxPreview, PatchError> {
        patchforge_sandbox::generate(html)
    }

    /// Revert a file to a snapshotted state. Returns the requested path
    /// the content was restored to.
    pub async fn rollback(&self, snapshot_id: &str) -> Result<String, PatchError> {
        self.snapshots.rollback(snapshot_id).await
    }

    pub async fn list_snapshots(&self) -> Result<Vec<SnapshotMeta>, PatchError> {
        self.snapshots.list().await
    }

    /// Build plan shown to the caller before anything is staged.
    pub fn generate_blueprint(&self, intent: &str) -> Blueprint {
        Blueprint {
            schema_version: SCHEMA_VERSION.to_string(),
            title: "Build plan".to_string(),
            intent: intent.to_string(),
            steps: vec![
                "Analyze the request".to_string(),
                "Identify the target file".to_string(),
                "Generate the proposed content".to_string(),
                "Stage a validated patch".to_string(),
                "Await approval".to_string(),
            ],
            timestamp: now_millis(),
        }
    }

    /// Current content of a target, with a missing file reading as empty
    /// and oversized sources refused.
    async fn read_current(&self, resolved: &std::path::Path) -> Result<String, PatchError> {
        match fs::metadata(resolved).await {
            Ok(meta) if meta.len() as usize > MAX_SNAPSHOT_BYTES => {
                return Err(PatchError::InputTooLarge {
                    size: meta.len() as usize,
                    limit: MAX_SNAPSHOT_BYTES,
                })
            }
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(String::new()),
            Err(err) => return Err(PatchError::StorageIo(err)),
        }
        fs::read_to_string(resolved)
            .await
            .map_err(PatchError::StorageIo)
    }
}
