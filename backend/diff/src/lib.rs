//! Diff engine: minimal line-level edit scripts and their unified-diff
//! encoding. The admission ceiling, LCS tie-break, and hunk grouping are
//! observable behavior the rest of the pipeline depends on.

pub mod engine;
pub mod unified;

pub use engine::{generate_diff, generate_diff_named, rebuild_modified, MAX_DIFF_LINES};
