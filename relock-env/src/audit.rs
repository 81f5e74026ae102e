//! Group/permission audit of a directory tree.

use std::collections::BTreeMap;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{io_err, PreflightError};

const GROUP_WRITE_BIT: u32 = 0o020;

/// Check every entry under `root` for the expected gid and group-write
/// permission. Symlinks are skipped.
///
/// Returns a map of offending path → list of issues, empty when the tree
/// is fully compliant.
pub fn check_tree(
    root: &Path,
    expected_gid: u32,
) -> Result<BTreeMap<String, Vec<String>>, PreflightError> {
    let mut problems: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            io_err(path, e.into())
        })?;
        if entry.path_is_symlink() {
            continue;
        }
        let meta = entry
            .metadata()
            .map_err(|e| io_err(entry.path(), e.into()))?;

        let mut issues = Vec::new();
        if meta.gid() != expected_gid {
            issues.push(format!(
                "incorrect group: expected gid {expected_gid}, got {}",
                meta.gid()
            ));
        }
        if meta.mode() & GROUP_WRITE_BIT == 0 {
            issues.push("not group-writeable".to_string());
        }
        if !issues.is_empty() {
            problems.insert(entry.path().display().to_string(), issues);
        }
    }

    Ok(problems)
}
