//! Targeted version-change detection over unified lockfile diffs.
//!
//! Works directly on diff text rather than parsed TOML: a unified diff is
//! not valid TOML, and the interesting signal is exactly which lines were
//! removed and added. The scanner is a small line-oriented state machine
//! tracking `[[package]]` block boundaries and the most recent `name =`
//! assignment, capturing `-version =` / `+version =` pairs once inside the
//! block whose name matches the requested package.

/// Outcome of scanning a diff for one package's version transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionChange {
    pub changed: bool,
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Scan `diff_text` for a version change of `package` (case-insensitive).
///
/// Structured lockfile diffs are scanned first. The moment a removed and an
/// added version with *different* values are seen inside the matching
/// package block, scanning stops — diffs carry at most one transition per
/// package per run. A removed/re-added pair with the *same* value (e.g.
/// only hash or metadata lines actually changed) is not a change, and
/// scanning continues.
///
/// If the structured scan finds no change, a fallback pass looks for a
/// plain requirement-pin addition (`+<package>==`), which covers
/// pip-compile-style manifests. The match is case-sensitive and anchored at
/// the start of the line with the literal `==` separator, so a package
/// whose name is a prefix of another cannot match. An added pin with no
/// corresponding removed pin (a brand-new dependency) counts as a change.
pub fn find_version_change(diff_text: &str, package: &str) -> VersionChange {
    let target = package.to_lowercase();

    let mut in_package_block = false;
    let mut current_name: Option<String> = None;
    let mut old_version: Option<String> = None;
    let mut new_version: Option<String> = None;

    for raw_line in diff_text.lines() {
        if raw_line.is_empty() {
            continue;
        }

        let marker = raw_line.as_bytes()[0] as char;
        let has_marker = matches!(marker, ' ' | '+' | '-');

        // Only these three markers carry file content in a unified diff;
        // headers and @@ hunks fall through the content checks below.
        let content = if has_marker {
            &raw_line[1..]
        } else {
            raw_line
        };
        let content = content.trim();

        if content == "[[package]]" {
            in_package_block = true;
            current_name = None;
            old_version = None;
            new_version = None;
            continue;
        }

        if !in_package_block {
            continue;
        }

        if content.starts_with("name =") {
            current_name = extract_first_quoted(content).map(str::to_string);
            continue;
        }

        let name_matches = current_name
            .as_deref()
            .map(|name| name.to_lowercase() == target)
            .unwrap_or(false);
        if !name_matches {
            continue;
        }

        if marker == '-' && content.starts_with("version =") {
            old_version = extract_first_quoted(content).map(str::to_string);
        } else if marker == '+' && content.starts_with("version =") {
            new_version = extract_first_quoted(content).map(str::to_string);
        }

        if let (Some(old), Some(new)) = (&old_version, &new_version) {
            if old != new {
                return VersionChange {
                    changed: true,
                    old: old_version,
                    new: new_version,
                };
            }
            // Same value on both sides: hash/metadata churn, not a version
            // change. Keep scanning for later blocks.
        }
    }

    if let Some(change) = find_pin_addition(diff_text, package) {
        return change;
    }

    VersionChange {
        changed: false,
        old: old_version,
        new: new_version,
    }
}

/// Fallback for plain `pip`-style requirement-pin diffs.
fn find_pin_addition(diff_text: &str, package: &str) -> Option<VersionChange> {
    let added_prefix = format!("+{package}==");
    let removed_prefix = format!("-{package}==");

    let mut old = None;
    let mut new = None;
    for line in diff_text.lines() {
        if let Some(rest) = line.strip_prefix(&added_prefix) {
            new = Some(pin_version(rest));
        } else if let Some(rest) = line.strip_prefix(&removed_prefix) {
            old = Some(pin_version(rest));
        }
    }

    new.map(|new| VersionChange {
        changed: true,
        old,
        new: Some(new),
    })
}

fn pin_version(rest: &str) -> String {
    rest.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// First double-quoted value on a TOML-like assignment line, if any.
fn extract_first_quoted(line: &str) -> Option<&str> {
    let start = line.find('"')? + 1;
    let end = line[start..].find('"')? + start;
    Some(&line[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_transition_is_detected() {
        let diff = "\
--- a/uv.lock
+++ b/uv.lock
@@ -10,7 +10,7 @@
 [[package]]
 name = \"django\"
-version = \"4.2.20\"
+version = \"4.2.27\"
 source = { registry = \"https://pypi.org/simple\" }
";
        let change = find_version_change(diff, "django");
        assert!(change.changed);
        assert_eq!(change.old.as_deref(), Some("4.2.20"));
        assert_eq!(change.new.as_deref(), Some("4.2.27"));
    }

    #[test]
    fn package_name_match_is_case_insensitive() {
        let diff = "\
 [[package]]
 name = \"Django\"
-version = \"4.2.20\"
+version = \"4.2.27\"
";
        assert!(find_version_change(diff, "django").changed);
    }

    #[test]
    fn same_version_removed_and_readded_is_not_a_change() {
        let diff = "\
 [[package]]
 name = \"django\"
-version = \"4.2.20\"
+version = \"4.2.20\"
-sdist = { url = \"https://old\", hash = \"sha256:aaa\" }
+sdist = { url = \"https://new\", hash = \"sha256:bbb\" }
";
        let change = find_version_change(diff, "django");
        assert!(!change.changed, "hash-only churn must not report a change");
    }

    #[test]
    fn metadata_only_changes_under_unchanged_version_are_ignored() {
        let diff = "\
 [[package]]
 name = \"django\"
 version = \"4.2.20\"
-wheels = [{ url = \"https://old\" }]
+wheels = [{ url = \"https://new\" }]
";
        assert!(!find_version_change(diff, "django").changed);
    }

    #[test]
    fn other_packages_do_not_match() {
        let diff = "\
 [[package]]
 name = \"djangorestframework\"
-version = \"3.14.0\"
+version = \"3.15.2\"
";
        assert!(!find_version_change(diff, "django").changed);
    }

    #[test]
    fn block_reentry_resets_pending_state() {
        // The old version of the target appears in one block; an unrelated
        // block intervenes; the new version appears in a later block. The
        // reset on `[[package]]` must prevent pairing across blocks.
        let diff = "\
 [[package]]
 name = \"django\"
-version = \"4.2.20\"
 [[package]]
 name = \"requests\"
 version = \"2.32.3\"
 [[package]]
 name = \"django\"
+version = \"4.2.27\"
";
        let change = find_version_change(diff, "django");
        assert!(!change.changed);
    }

    #[test]
    fn pin_diff_fallback_detects_update() {
        let diff = "\
--- a/requirements.txt
+++ b/requirements.txt
@@ -1,4 +1,4 @@
 certifi==2026.1.1
-django==5.1.2
+django==5.1.3
-somepkg==1.0.0
+somepkg==1.1.0
";
        let change = find_version_change(diff, "django");
        assert!(change.changed);
        assert_eq!(change.old.as_deref(), Some("5.1.2"));
        assert_eq!(change.new.as_deref(), Some("5.1.3"));
    }

    #[test]
    fn pin_fallback_counts_brand_new_dependency() {
        let diff = "\
 certifi==2026.1.1
-somepkg==1.0.0
+somepkg==1.1.0
+django==5.1.3
";
        let change = find_version_change(diff, "django");
        assert!(change.changed);
        assert!(change.old.is_none());
        assert_eq!(change.new.as_deref(), Some("5.1.3"));
    }

    #[test]
    fn pin_fallback_is_case_sensitive() {
        let diff = "\
 certifi==2026.1.1
+Django==5.1.3
";
        assert!(!find_version_change(diff, "django").changed);
    }

    #[test]
    fn pin_fallback_requires_separator_after_name() {
        let diff = "\
-django-extensions==3.2.0
+django-extensions==3.2.3
";
        assert!(!find_version_change(diff, "django").changed);
    }

    #[test]
    fn removal_only_is_not_a_change() {
        let diff = "\
 certifi==2026.1.1
-django==5.1.2
";
        assert!(!find_version_change(diff, "django").changed);
    }

    #[test]
    fn empty_diff_reports_no_change() {
        assert_eq!(find_version_change("", "django"), VersionChange::default());
    }
}
