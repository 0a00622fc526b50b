pub mod error;
pub mod types;

pub use error::PatchError;
pub use types::{
    now_millis, DiffMeta, DiffOp, DiffResult, DiffSummary, OpKind, PatchRecord, SandboxPreview,
    SanitizeReport, SnapshotMeta, SnapshotRecord, Verdict,
};
