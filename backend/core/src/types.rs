//! Shared data model for the patch pipeline.
//!
//! Everything here is a plain value: constructed once, serialized with
//! camelCase field names on disk, and never mutated after creation.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current epoch time in milliseconds, the timestamp unit used by every
/// persisted record.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Kind of a single line-level edit operation.
///
/// Serialized as `eq`/`add`/`rem` to match the on-disk patch record format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    #[serde(rename = "eq")]
    Equal,
    #[serde(rename = "add")]
    Insert,
    #[serde(rename = "rem")]
    Delete,
}

/// One step of an edit script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOp {
    pub op: OpKind,
    pub line: String,
}

impl DiffOp {
    pub fn new(op: OpKind, line: impl Into<String>) -> Self {
        Self {
            op,
            line: line.into(),
        }
    }
}

/// Quantitative change summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    /// Coarse magnitude signal: `min(added, removed)`. Not a claim about
    /// which lines correspond.
    pub changed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffMeta {
    pub original_lines: usize,
    pub modified_lines: usize,
    pub generated_at: i64,
}

/// Outcome of comparing two text blobs. Immutable once built; owned by
/// whichever [`PatchRecord`] embeds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResult {
    /// Ordered edit script; insertion order defines the script.
    pub ops: Vec<DiffOp>,
    /// Canonical unified-diff rendering (`---`/`+++`/`@@` hunks).
    pub unified: String,
    pub summary: DiffSummary,
    pub meta: DiffMeta,
}

/// Validator outcome. Consumed once by the orchestrator, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

/// Durable record of a proposed change, staged until approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchRecord {
    pub schema_version: String,
    /// `patch-<epochMillis>-<hex random>.json`; storage key and external handle.
    pub id: String,
    /// Requested relative path, as supplied by the caller.
    pub file: String,
    /// SHA-256 of the resolved absolute path. The raw absolute path is
    /// never stored so records cannot leak filesystem layout.
    pub target_path_digest: String,
    /// SHA-256 of the original content at diff time; apply re-verifies it
    /// and fails closed if the file drifted.
    pub base_digest: String,
    pub diff: DiffResult,
    pub timestamp: i64,
}

/// Point-in-time capture of a file's prior content, consumed by rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    /// `rollback-<epochMillis>-<hex random>.json`.
    pub id: String,
    pub file: String,
    pub resolved_path: String,
    /// SHA-256 of `original_content`; must hold at all times, rollback
    /// refuses to run otherwise.
    pub checksum: String,
    pub original_content: String,
    pub created_at: i64,
}

/// What snapshot listing exposes: metadata only, never raw content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub id: String,
    pub file: String,
    pub checksum: String,
    pub size_bytes: usize,
    pub created_at: i64,
}

impl From<&SnapshotRecord> for SnapshotMeta {
    fn from(record: &SnapshotRecord) -> Self {
        Self {
            id: record.id.clone(),
            file: record.file.clone(),
            checksum: record.checksum.clone(),
            size_bytes: record.original_content.len(),
            created_at: record.created_at,
        }
    }
}

/// Diagnostic report accompanying a sandbox preview. It describes what the
/// *input* contained before stripping, not a guarantee about the output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeReport {
    pub removed_scripts: bool,
    pub removed_events: bool,
    pub removed_iframes: bool,
    pub removed_svg: bool,
    pub size_original: usize,
    pub size_final: usize,
    pub timestamp: i64,
}

/// Ephemeral result of a preview render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxPreview {
    pub html: String,
    pub report: SanitizeReport,
}
