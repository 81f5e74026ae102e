//! Best-effort group/permission fixup.
//!
//! Runs as the final action of every orchestration, whatever happened
//! earlier. Failures are logged per path and never propagated: wrong
//! permissions are repaired opportunistically, not enforced here.

use std::path::Path;

use relock_core::process::run_captured;

/// Recursively set group ownership to `gid` and grant group-write on each
/// of `paths`. Missing paths are skipped.
pub fn fix_group_and_permissions(paths: &[&Path], gid: u32) {
    for path in paths {
        if !path.exists() {
            tracing::debug!("fixup skipping missing path {}", path.display());
            continue;
        }
        let target = path.display().to_string();
        chgrp_recursive(&target, gid);
        chmod_group_write(&target);
    }
    tracing::info!("ok / attempted group and permission fixup");
}

fn chgrp_recursive(target: &str, gid: u32) {
    let args = vec!["-R".to_string(), gid.to_string(), target.to_string()];
    match run_captured("chgrp", &args, None, &[]) {
        Ok(output) if output.ok => tracing::debug!("chgrp ok for {target}"),
        Ok(output) => tracing::warn!("chgrp failed for {target}: {}", output.describe()),
        Err(e) => tracing::warn!("chgrp could not run for {target}: {e}"),
    }
}

fn chmod_group_write(target: &str) {
    let args = vec!["-R".to_string(), "g=rwX".to_string(), target.to_string()];
    match run_captured("chmod", &args, None, &[]) {
        Ok(output) if output.ok => tracing::debug!("chmod ok for {target}"),
        Ok(output) => tracing::warn!("chmod failed for {target}: {}", output.describe()),
        Err(e) => tracing::warn!("chmod could not run for {target}: {e}"),
    }
}
