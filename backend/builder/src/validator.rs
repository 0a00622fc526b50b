//! Heuristic patch-safety validator.
//!
//! A fixed, ordered rule set classifies a diff as safe or unsafe; the
//! first failing rule wins and nothing downstream runs on a rejection.
//!
//! This is an allow-by-default heuristic speed-bump, not a security
//! control: the pattern scan is trivially evadable via encoding or
//! whitespace tricks. Its coverage is frozen: widening detection would
//! change observable behavior callers depend on.

use once_cell::sync::Lazy;
use regex::Regex;

use patchforge_core::{DiffResult, OpKind, Verdict};

/// Absolute ceiling on added + removed lines.
const MAX_PATCH_LINES: usize = 3_000;

/// Destructive/dangerous-operation signatures, matched case-insensitively
/// against trimmed insert/delete lines.
static DANGER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\brm\s+-rf\b",
        r"\brimraf\b",
        r"\bunlink\b",
        r"\brmdir\b",
        r"\bdel\s+\S+",
        r"\bprocess\.exit\b",
        r"while\s*\(\s*true\s*\)",
        r"<script>",
        r"\beval\s*\(",
        r"\bfunction\s*\(",
        r"\bchild_process\b",
        r"\bexec\s*\(",
    ]
    .iter()
    .map(|pattern| Regex::new(&format!("(?i){pattern}")).expect("danger pattern compiles"))
    .collect()
});

/// Classify a diff. Pure, no I/O, never panics; applied rules in order,
/// first failure wins.
pub fn validate(diff: &DiffResult) -> Verdict {
    // 1) Structural shape of the unified rendering.
    if let Some(verdict) = check_unified_shape(diff) {
        return verdict;
    }

    let removed = diff
        .ops
        .iter()
        .filter(|op| op.op == OpKind::Delete)
        .count();
    let added = diff
        .ops
        .iter()
        .filter(|op| op.op == OpKind::Insert)
        .count();
    let equal = diff.ops.iter().filter(|op| op.op == OpKind::Equal).count();
    let total = removed + added + equal;

    // 2) Near-total replacement. The two absolute floors keep small files,
    // where ratio math is noisy, from being false-flagged.
    let removal_ratio = removed as f64 / total.max(1) as f64;
    if removal_ratio > 0.90 && equal < 3 && added < 3 {
        return Verdict::reject("patch replaces or deletes nearly the entire file");
    }

    // 3) Dangerous-operation scan over changed lines, skipping comments.
    for op in &diff.ops {
        if op.op == OpKind::Equal {
            continue;
        }
        let line = op.line.trim().to_lowercase();
        if line.starts_with("//") || line.starts_with("/*") || line.starts_with('*') {
            continue;
        }
        for pattern in DANGER_PATTERNS.iter() {
            if pattern.is_match(&line) {
                return Verdict::reject(format!(
                    "dangerous pattern detected ({}); patch blocked",
                    pattern.as_str()
                ));
            }
        }
    }

    // 4) Absolute size ceiling.
    if added + removed > MAX_PATCH_LINES {
        return Verdict::reject("patch too large to review safely");
    }

    // 5) Disproportionate deletion.
    if removed > 500 && added < 10 {
        return Verdict::reject("mass deletion with almost no additions");
    }

    // 6) Unified sanity re-check. Duplicates part of rule 1 on purpose.
    if let Some(verdict) = check_unified_shape(diff) {
        return verdict;
    }

    Verdict::accept()
}

fn check_unified_shape(diff: &DiffResult) -> Option<Verdict> {
    let lines: Vec<&str> = diff.unified.split('\n').collect();
    if diff.unified.is_empty() || lines.len() < 3 || !lines[0].starts_with("---") {
        return Some(Verdict::reject("unified diff malformed or incomplete"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchforge_core::{DiffMeta, DiffOp, DiffSummary};

    fn diff_from_ops(ops: Vec<DiffOp>) -> DiffResult {
        let added = ops.iter().filter(|o| o.op == OpKind::Insert).count();
        let removed = ops.iter().filter(|o| o.op == OpKind::Delete).count();
        DiffResult {
            unified: "--- original\n+++ modified\n@@ -1,1 +1,1 @@".to_string(),
            summary: DiffSummary {
                added,
                removed,
                changed: added.min(removed),
            },
            meta: DiffMeta {
                original_lines: 0,
                modified_lines: 0,
                generated_at: 0,
            },
            ops,
        }
    }

    fn deletes(n: usize) -> Vec<DiffOp> {
        (0..n)
            .map(|i| DiffOp::new(OpKind::Delete, format!("line {i}")))
            .collect()
    }

    fn equals(n: usize) -> Vec<DiffOp> {
        (0..n)
            .map(|i| DiffOp::new(OpKind::Equal, format!("ctx {i}")))
            .collect()
    }

    #[test]
    fn accepts_a_plain_edit() {
        let mut ops = equals(5);
        ops.push(DiffOp::new(OpKind::Delete, "old line"));
        ops.push(DiffOp::new(OpKind::Insert, "new line"));
        assert!(validate(&diff_from_ops(ops)).accepted);
    }

    #[test]
    fn near_total_replacement_is_rejected() {
        // 95% removed, 1 equal, 0 added.
        let mut ops = deletes(19);
        ops.extend(equals(1));
        let verdict = validate(&diff_from_ops(ops));
        assert!(!verdict.accepted);
        assert!(verdict.reason.unwrap().contains("entire file"));
    }

    #[test]
    fn equal_floor_clears_the_replacement_rule() {
        // Same removal ratio but 5 context lines: boundary sits at
        // equal_count < 3.
        let mut ops = deletes(95);
        ops.extend(equals(5));
        assert!(validate(&diff_from_ops(ops)).accepted);
    }

    #[test]
    fn destructive_command_in_insert_is_rejected() {
        let mut ops = equals(3);
        ops.push(DiffOp::new(OpKind::Insert, "rm -rf /data"));
        let verdict = validate(&diff_from_ops(ops));
        assert!(!verdict.accepted);
        assert!(verdict.reason.unwrap().contains("rm"));
    }

    #[test]
    fn the_same_text_in_a_comment_is_ignored() {
        let mut ops = equals(3);
        ops.push(DiffOp::new(OpKind::Insert, "// rm -rf /data"));
        assert!(validate(&diff_from_ops(ops)).accepted);
    }

    #[test]
    fn inline_script_tag_is_rejected() {
        let mut ops = equals(3);
        ops.push(DiffOp::new(OpKind::Insert, "<script>alert(1)</script>"));
        assert!(!validate(&diff_from_ops(ops)).accepted);
    }

    #[test]
    fn oversized_patch_is_rejected() {
        let mut ops = equals(10);
        ops.extend(deletes(1_501));
        ops.extend(
            (0..1_500).map(|i| DiffOp::new(OpKind::Insert, format!("new {i}"))),
        );
        let verdict = validate(&diff_from_ops(ops));
        assert!(!verdict.accepted);
        assert!(verdict.reason.unwrap().contains("too large"));
    }

    #[test]
    fn mass_deletion_without_additions_is_rejected() {
        let mut ops = equals(600);
        ops.extend(deletes(501));
        let verdict = validate(&diff_from_ops(ops));
        assert!(!verdict.accepted);
        assert!(verdict.reason.unwrap().contains("mass deletion"));
    }

    #[test]
    fn malformed_unified_text_is_rejected() {
        let mut diff = diff_from_ops(equals(3));
        diff.unified = "not a diff".to_string();
        assert!(!validate(&diff).accepted);
    }
}
