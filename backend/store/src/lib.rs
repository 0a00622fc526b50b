//! Patch/snapshot storage: individually addressable JSON records with
//! SHA-256 integrity, write-ahead temp-then-rename atomicity, and path
//! containment against the workspace root.

pub mod fsio;
pub mod integrity;
pub mod patches;
pub mod snapshots;

pub use fsio::{resolve_contained, write_atomic};
pub use integrity::{new_record_id, sha256_hex};
pub use patches::PatchStore;
pub use snapshots::{SnapshotStore, MAX_SNAPSHOT_BYTES};
