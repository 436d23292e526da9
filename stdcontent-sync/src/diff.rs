//! Unified diff support for `stdcontent diff`.

use similar::TextDiff;

use stdcontent_core::normalize;

use crate::engine::ReconcilePlan;

/// A single file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub unified_diff: String,
}

/// Diff every changed path and every removal of `plan` against what the
/// backend currently holds.
///
/// Both sides are normalized first, so a pure line-ending difference never
/// shows up here.
pub fn render_diff(plan: &ReconcilePlan) -> Vec<FileDiff> {
    let mut diffs = Vec::new();

    for path in &plan.changed {
        let Some(desired) = plan.files.get(path) else {
            continue;
        };
        let existing = current_bytes(plan, path);
        diffs.push(FileDiff {
            path: path.clone(),
            unified_diff: unified(path, &existing, desired),
        });
    }

    for path in &plan.removals {
        let existing = current_bytes(plan, path);
        diffs.push(FileDiff {
            path: path.clone(),
            unified_diff: unified(path, &existing, &[]),
        });
    }

    diffs
}

fn current_bytes(plan: &ReconcilePlan, path: &str) -> Vec<u8> {
    match plan.current.get(path) {
        Some(Some(bytes)) => normalize(bytes),
        _ => Vec::new(),
    }
}

fn unified(path: &str, old: &[u8], new: &[u8]) -> String {
    let (Ok(old), Ok(new)) = (std::str::from_utf8(old), std::str::from_utf8(new)) else {
        return format!("Binary files a/{path} and b/{path} differ\n");
    };

    let old_header = format!("a/{path}");
    let new_header = format!("b/{path}");
    TextDiff::from_lines(old, new)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string()
}
