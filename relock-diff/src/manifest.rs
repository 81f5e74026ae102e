//! Manifest-level change detection.

use similar::TextDiff;

/// Result of comparing two manifest texts.
///
/// `changed == false` guarantees the manifest bodies are identical once
/// leading comment lines are dropped; `diff_text` is empty in that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub changed: bool,
    pub diff_text: String,
}

impl DiffResult {
    pub fn unchanged() -> Self {
        Self {
            changed: false,
            diff_text: String::new(),
        }
    }
}

/// Compare two manifests, ignoring leading comment lines on both sides.
///
/// The first lines of a freshly compiled manifest carry a generation
/// timestamp, and an applied manifest carries an injected active marker;
/// neither represents a dependency change, so the comparison starts at the
/// first non-comment line. The remaining line sequences must match in
/// order, verbatim, for the manifests to be considered equal.
///
/// On a difference, `diff_text` is a unified diff of the filtered bodies
/// with `previous_label` / `current_label` as the file headers.
pub fn compare_manifests(
    previous: &str,
    current: &str,
    previous_label: &str,
    current_label: &str,
) -> DiffResult {
    let prev_body = body_after_leading_comments(previous);
    let curr_body = body_after_leading_comments(current);

    if prev_body == curr_body {
        return DiffResult::unchanged();
    }

    let diff_text = TextDiff::from_lines(&prev_body, &curr_body)
        .unified_diff()
        .header(previous_label, current_label)
        .context_radius(3)
        .to_string();

    DiffResult {
        changed: true,
        diff_text,
    }
}

/// Drop the leading run of `#` comment lines and rejoin the remainder.
///
/// Only the *leading* block is filtered; comments further down the file
/// (e.g. `# via` annotations under a pin) are part of the body and do
/// participate in the comparison.
fn body_after_leading_comments(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let first_real = lines
        .iter()
        .position(|line| !line.starts_with('#'))
        .unwrap_or(lines.len());
    let mut body = lines[first_real..].join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    body
}
