//! Line-level diff computation.
//!
//! Classic bottom-up LCS table over the two line arrays, then a single
//! forward walk reconstructing the edit script. The walk's tie-break (on
//! divergence, prefer delete when the LCS looking ahead in the original is
//! >= looking ahead in the modified) determines which side moves first on
//! conflicting edits and is load-bearing: the unified rendering of a given
//! input pair must be stable byte-for-byte.

use patchforge_core::types::now_millis;
use patchforge_core::{DiffMeta, DiffOp, DiffResult, DiffSummary, OpKind, PatchError};

use crate::unified::render_unified;

/// Combined line-count ceiling. The LCS table is O(n*m) in time and space,
/// so admission control is the DoS bound, not a quality knob.
pub const MAX_DIFF_LINES: usize = 20_000;

/// Compute a line-level diff with the default `original`/`modified` header
/// names.
pub fn generate_diff(original: &str, modified: &str) -> Result<DiffResult, PatchError> {
    generate_diff_named(original, modified, "original", "modified")
}

/// Compute a line-level diff with caller-supplied unified header names.
pub fn generate_diff_named(
    original: &str,
    modified: &str,
    original_name: &str,
    modified_name: &str,
) -> Result<DiffResult, PatchError> {
    let a_text = original.replace('\r', "");
    let b_text = modified.replace('\r', "");
    let a: Vec<&str> = a_text.split('\n').collect();
    let b: Vec<&str> = b_text.split('\n').collect();

    if a.len() + b.len() > MAX_DIFF_LINES {
        return Err(PatchError::DiffTooLarge(MAX_DIFF_LINES));
    }

    let ops = line_diff(&a, &b);
    let unified = render_unified(&ops, original_name, modified_name);
    let summary = summarize(&ops);

    Ok(DiffResult {
        meta: DiffMeta {
            original_lines: a.len(),
            modified_lines: b.len(),
            generated_at: now_millis(),
        },
        ops,
        unified,
        summary,
    })
}

/// Rebuild the modified text from an edit script: every equal and insert
/// line in order. Used by apply and by the round-trip tests.
pub fn rebuild_modified(ops: &[DiffOp]) -> String {
    let lines: Vec<&str> = ops
        .iter()
        .filter(|op| op.op != OpKind::Delete)
        .map(|op| op.line.as_str())
        .collect();
    lines.join("\n")
}

fn line_diff(a: &[&str], b: &[&str]) -> Vec<DiffOp> {
    let n = a.len();
    let m = b.len();

    // Flat (n+1) x (m+1) table, filled bottom-up.
    let width = m + 1;
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if a[i] == b[j] {
                1 + lcs[(i + 1) * width + j + 1]
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::new();
    let mut i = 0;
    let mut j = 0;

    while i < n && j < m {
        if a[i] == b[j] {
            ops.push(DiffOp::new(OpKind::Equal, a[i]));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            ops.push(DiffOp::new(OpKind::Delete, a[i]));
            i += 1;
        } else {
            ops.push(DiffOp::new(OpKind::Insert, b[j]));
            j += 1;
        }
    }

    // Trailing unmatched lines flush as pure deletes/inserts.
    while i < n {
        ops.push(DiffOp::new(OpKind::Delete, a[i]));
        i += 1;
    }
    while j < m {
        ops.push(DiffOp::new(OpKind::Insert, b[j]));
        j += 1;
    }

    ops
}

fn summarize(ops: &[DiffOp]) -> DiffSummary {
    let mut added = 0;
    let mut removed = 0;
    for op in ops {
        match op.op {
            OpKind::Insert => added += 1,
            OpKind::Delete => removed += 1,
            OpKind::Equal => {}
        }
    }
    DiffSummary {
        added,
        removed,
        changed: added.min(removed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> String {
        (0..n).map(|i| i.to_string()).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn identical_inputs_yield_pure_equals() {
        let text = "alpha\nbeta\ngamma";
        let diff = generate_diff(text, text).unwrap();
        assert!(diff.ops.iter().all(|op| op.op == OpKind::Equal));
        assert_eq!(diff.summary, DiffSummary::default());
    }

    #[test]
    fn single_line_change() {
        let diff = generate_diff("a\nb\nc", "a\nx\nc").unwrap();
        let kinds: Vec<OpKind> = diff.ops.iter().map(|op| op.op).collect();
        // Tie-break emits the delete before the insert.
        assert_eq!(
            kinds,
            vec![OpKind::Equal, OpKind::Delete, OpKind::Insert, OpKind::Equal]
        );
        assert_eq!(diff.summary.added, 1);
        assert_eq!(diff.summary.removed, 1);
        assert_eq!(diff.summary.changed, 1);
    }

    #[test]
    fn carriage_returns_are_stripped() {
        let diff = generate_diff("a\r\nb", "a\nb").unwrap();
        assert_eq!(diff.summary, DiffSummary::default());
    }

    #[test]
    fn round_trip_reconstructs_modified() {
        let cases = [
            ("", "hello"),
            ("hello", ""),
            ("a\nb\nc", "a\nx\nc\nd"),
            ("one\ntwo\nthree\nfour", "zero\ntwo\nfour"),
            ("same\nsame\nsame", "same\nsame\nsame"),
        ];
        for (original, modified) in cases {
            let diff = generate_diff(original, modified).unwrap();
            assert_eq!(rebuild_modified(&diff.ops), modified, "case {original:?} -> {modified:?}");
        }
    }

    #[test]
    fn admission_rejects_over_the_line_ceiling() {
        // split('\n') on k joined lines yields k entries, so 10_000 + 10_001
        // lands one over the ceiling.
        let a = lines(10_000);
        let b = lines(10_001);
        match generate_diff(&a, &b) {
            Err(PatchError::DiffTooLarge(limit)) => assert_eq!(limit, MAX_DIFF_LINES),
            other => panic!("expected DiffTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn admission_accepts_at_the_line_ceiling() {
        let a = lines(10_000);
        let b = lines(10_000);
        assert!(generate_diff(&a, &b).is_ok());
    }

    #[test]
    fn changed_is_min_of_added_and_removed() {
        let diff = generate_diff("a\nb\nc\nd", "x").unwrap();
        assert_eq!(diff.summary.removed, 4);
        assert_eq!(diff.summary.added, 1);
        assert_eq!(diff.summary.changed, 1);
    }
}
