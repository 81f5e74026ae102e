//! Preflight validation of the target project.
//!
//! Checks run in dependency order; the first failure halts the run. No
//! filesystem mutation happens anywhere in this module.

use std::collections::HashMap;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use relock_core::process::run_captured;
use relock_core::{EnvTier, ProjectLayout};

use crate::audit;
use crate::error::{io_err, PreflightError};

/// Facts established by a successful preflight pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preflight {
    pub tier: EnvTier,
    /// Numeric gid shared by the project's files; used for audit and fixup.
    pub gid: u32,
    /// Interpreter version the resolver compiles against.
    pub python_version: String,
}

/// Validate the environment and establish run facts.
pub fn run(layout: &ProjectLayout, uv_path: &Path) -> Result<Preflight, PreflightError> {
    let project = layout.project();
    if !project.exists() {
        return Err(PreflightError::ProjectPathMissing {
            path: project.to_path_buf(),
        });
    }
    tracing::info!("ok / project path {}", project.display());

    let branch = current_branch(layout);
    if branch != "main" {
        return Err(PreflightError::WrongBranch { branch });
    }
    tracing::info!("ok / branch `{branch}`");

    check_working_tree(layout)?;

    for tier in EnvTier::all() {
        let source = layout.requirements_in(tier);
        if !source.exists() {
            return Err(PreflightError::MissingRequirements { path: source });
        }
    }
    let tier = tier_for_hostname(&hostname());
    tracing::info!("ok / environment tier `{tier}`");

    if !uv_path.exists() {
        return Err(PreflightError::UvMissing {
            path: uv_path.to_path_buf(),
        });
    }

    let python_version = read_python_version(layout)?;
    tracing::info!("ok / python version `{python_version}`");

    let gid = infer_gid(project)?;
    tracing::info!("ok / project gid {gid}");

    check_tree_permissions(layout, gid)?;

    Ok(Preflight {
        tier,
        gid,
        python_version,
    })
}

/// Current branch name, read from `.git/HEAD` directly.
///
/// Reading the file avoids a `git` subprocess and its `dubious ownership`
/// refusals when the updater runs as a different user than the checkout
/// owner.
pub fn current_branch(layout: &ProjectLayout) -> String {
    let head = layout.git_head();
    match std::fs::read_to_string(&head) {
        Ok(contents) => {
            let ref_line = contents.trim();
            if let Some(reference) = ref_line.strip_prefix("ref:") {
                reference
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            } else {
                "detached".to_string()
            }
        }
        Err(e) => {
            tracing::warn!("could not read {}: {e}", head.display());
            "branch-not-found".to_string()
        }
    }
}

fn check_working_tree(layout: &ProjectLayout) -> Result<(), PreflightError> {
    let output = run_captured("git", &["status".to_string()], Some(layout.project()), &[])
        .map_err(|e| io_err(layout.project(), e))?;
    if !working_tree_clean(&output.stdout) {
        return Err(PreflightError::DirtyWorkingTree);
    }
    tracing::info!("ok / working tree clean");
    Ok(())
}

/// Whether `git status` output reports a clean checkout.
///
/// Different git versions print "working tree clean" or "working directory
/// clean"; the shared word is all the invocation guarantees, so the check
/// is a substring match isolated here.
pub fn working_tree_clean(stdout: &str) -> bool {
    stdout.contains("clean")
}

/// Map a lowercase host name to its deployment tier.
///
/// Hosts named `d*`/`q*` are staging, `p*` production, anything else local.
pub fn tier_for_hostname(hostname: &str) -> EnvTier {
    match hostname.chars().next() {
        Some('d') | Some('q') => EnvTier::Staging,
        Some('p') => EnvTier::Production,
        _ => EnvTier::Local,
    }
}

/// Lowercased system host name; `unknown` when it cannot be determined.
pub fn hostname() -> String {
    match run_captured("hostname", &[], None, &[]) {
        Ok(output) if output.ok => output.stdout.trim().to_lowercase(),
        _ => "unknown".to_string(),
    }
}

fn read_python_version(layout: &ProjectLayout) -> Result<String, PreflightError> {
    let path = layout.python_version_file();
    let version = std::fs::read_to_string(&path)
        .map_err(|_| PreflightError::PythonVersionMissing { path: path.clone() })?;
    let version = version.trim().to_string();
    if version.is_empty() {
        return Err(PreflightError::PythonVersionMissing { path });
    }
    Ok(version)
}

/// Most common gid among the project directory's entries.
pub fn infer_gid(project: &Path) -> Result<u32, PreflightError> {
    let entries = std::fs::read_dir(project).map_err(|e| io_err(project, e))?;
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for entry in entries.filter_map(|e| e.ok()) {
        if let Ok(meta) = entry.metadata() {
            *counts.entry(meta.gid()).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(gid, _)| gid)
        .ok_or_else(|| PreflightError::GroupInference {
            message: format!("no entries under {}", project.display()),
        })
}

fn check_tree_permissions(layout: &ProjectLayout, gid: u32) -> Result<(), PreflightError> {
    let mut problems = audit::check_tree(&layout.venv_dir(), gid)?;
    let backups = layout.backups_dir();
    if backups.exists() {
        problems.extend(audit::check_tree(&backups, gid)?);
    }
    if problems.is_empty() {
        tracing::info!("ok / group and permissions");
        return Ok(());
    }
    let report = serde_json::to_string_pretty(&problems).unwrap_or_else(|_| format!("{problems:?}"));
    Err(PreflightError::PermissionAudit { report })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn tier_inference_by_hostname_prefix() {
        assert_eq!(tier_for_hostname("dweb1.services.example.edu"), EnvTier::Staging);
        assert_eq!(tier_for_hostname("qweb1"), EnvTier::Staging);
        assert_eq!(tier_for_hostname("pweb2"), EnvTier::Production);
        assert_eq!(tier_for_hostname("laptop"), EnvTier::Local);
        assert_eq!(tier_for_hostname(""), EnvTier::Local);
    }

    #[test]
    fn clean_predicate_matches_both_git_phrasings() {
        assert!(working_tree_clean("nothing to commit, working tree clean"));
        assert!(working_tree_clean("nothing to commit, working directory clean"));
        assert!(!working_tree_clean("Changes not staged for commit"));
    }

    #[test]
    fn branch_read_from_head_ref() {
        let root = TempDir::new().unwrap();
        let project = root.path().join("app");
        fs::create_dir_all(project.join(".git")).unwrap();
        fs::write(project.join(".git").join("HEAD"), "ref: refs/heads/main\n").unwrap();
        assert_eq!(current_branch(&ProjectLayout::new(&project)), "main");
    }

    #[test]
    fn detached_head_is_not_a_branch() {
        let root = TempDir::new().unwrap();
        let project = root.path().join("app");
        fs::create_dir_all(project.join(".git")).unwrap();
        fs::write(project.join(".git").join("HEAD"), "0123abcd\n").unwrap();
        assert_eq!(current_branch(&ProjectLayout::new(&project)), "detached");
    }

    #[test]
    fn missing_head_reports_placeholder() {
        let root = TempDir::new().unwrap();
        let project = root.path().join("app");
        fs::create_dir_all(&project).unwrap();
        assert_eq!(
            current_branch(&ProjectLayout::new(&project)),
            "branch-not-found"
        );
    }

    #[test]
    fn infer_gid_uses_directory_entries() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("a.txt"), "a").unwrap();
        fs::write(root.path().join("b.txt"), "b").unwrap();

        let expected = fs::metadata(root.path().join("a.txt")).unwrap().gid();
        assert_eq!(infer_gid(root.path()).unwrap(), expected);
    }

    #[test]
    fn infer_gid_fails_on_empty_directory() {
        let root = TempDir::new().unwrap();
        assert!(matches!(
            infer_gid(root.path()),
            Err(PreflightError::GroupInference { .. })
        ));
    }
}
