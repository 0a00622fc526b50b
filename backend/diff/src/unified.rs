//! Unified-diff rendering.
//!
//! Contiguous non-equal operations are grouped into hunks; a hunk flushes
//! whenever an equal operation is encountered or the stream ends. Hunk
//! headers carry 1-based start lines for both sides.

use patchforge_core::{DiffOp, OpKind};

pub fn render_unified(ops: &[DiffOp], original_name: &str, modified_name: &str) -> String {
    let mut out = vec![format!("--- {original_name}"), format!("+++ {modified_name}")];

    let mut a_line = 1usize;
    let mut b_line = 1usize;
    let mut hunk: Vec<String> = Vec::new();
    let mut a_start = 0usize;
    let mut b_start = 0usize;
    let mut a_count = 0usize;
    let mut b_count = 0usize;

    for op in ops {
        match op.op {
            OpKind::Equal => {
                if !hunk.is_empty() {
                    out.push(format!("@@ -{a_start},{a_count} +{b_start},{b_count} @@"));
                    out.append(&mut hunk);
                    a_count = 0;
                    b_count = 0;
                }
                out.push(format!(" {}", op.line));
                a_line += 1;
                b_line += 1;
            }
            OpKind::Delete => {
                if hunk.is_empty() {
                    a_start = a_line;
                    b_start = b_line;
                }
                hunk.push(format!("-{}", op.line));
                a_line += 1;
                a_count += 1;
            }
            OpKind::Insert => {
                if hunk.is_empty() {
                    a_start = a_line;
                    b_start = b_line;
                }
                hunk.push(format!("+{}", op.line));
                b_line += 1;
                b_count += 1;
            }
        }
    }

    if !hunk.is_empty() {
        out.push(format!("@@ -{a_start},{a_count} +{b_start},{b_count} @@"));
        out.append(&mut hunk);
    }

    out.join("\n")
}
