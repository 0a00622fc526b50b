use thiserror::Error;

/// Top-level error type for the PatchForge pipeline.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("invalid input: {0}")]
    ValidationInput(String),

    #[error("diff too large: combined input exceeds {0} lines")]
    DiffTooLarge(usize),

    #[error("input too large: {size} bytes (limit {limit})")]
    InputTooLarge { size: usize, limit: usize },

    #[error("patch rejected: {0}")]
    PatchRejected(String),

    /// Reported generically on purpose: the attempted path is never echoed.
    #[error("target path not permitted")]
    PathTraversal,

    #[error("integrity failure: {0}")]
    IntegrityFailure(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("embedded SVG content is blocked")]
    SvgBlocked,

    #[error("storage I/O error: {0}")]
    StorageIo(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for PatchError {
    fn from(err: serde_json::Error) -> Self {
        PatchError::ValidationInput(format!("malformed record: {err}"))
    }
}
