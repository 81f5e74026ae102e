//! Derived filesystem layout for a managed project.
//!
//! # On-disk layout
//!
//! ```text
//! <parent>/
//!   .env                        (project admin addresses — ADMINS_JSON)
//!   requirements_backups/       (retained manifest snapshots + run lock)
//!   applied_manifest.bak        (single-slot rollback anchor)
//!   <project>/
//!     .python-version
//!     .venv/                    (the environment relock converges)
//!     .git/HEAD
//!     requirements/{local,staging,production}.in
//!     run_tests.py
//!     manage.py
//!     config/tmp/restart.txt    (touched after a successful apply)
//! ```
//!
//! All paths are derived once from the resolved project root; nothing in
//! this module touches the filesystem.

use std::path::{Path, PathBuf};

use crate::types::EnvTier;

/// Directory name holding retained snapshots, sibling to the project root.
pub const BACKUP_DIR_NAME: &str = "requirements_backups";

/// Filename of the single-slot rollback anchor, sibling to the project root.
pub const ANCHOR_FILE_NAME: &str = "applied_manifest.bak";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    project: PathBuf,
}

impl ProjectLayout {
    pub fn new(project: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
        }
    }

    /// The project root itself.
    pub fn project(&self) -> &Path {
        &self.project
    }

    /// Short project name used in notification subjects and bodies.
    pub fn project_name(&self) -> String {
        self.project
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.project.display().to_string())
    }

    fn parent(&self) -> PathBuf {
        self.project
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.project.clone())
    }

    /// `<parent>/requirements_backups/`
    pub fn backups_dir(&self) -> PathBuf {
        self.parent().join(BACKUP_DIR_NAME)
    }

    /// `<parent>/applied_manifest.bak` — the rollback anchor slot.
    pub fn anchor_path(&self) -> PathBuf {
        self.parent().join(ANCHOR_FILE_NAME)
    }

    /// `<parent>/.env` — per-project settings read for admin recipients.
    pub fn env_file(&self) -> PathBuf {
        self.parent().join(".env")
    }

    /// `<project>/requirements/<tier>.in`
    pub fn requirements_in(&self, tier: EnvTier) -> PathBuf {
        self.project
            .join("requirements")
            .join(format!("{}.in", tier.as_str()))
    }

    /// `<project>/.venv/`
    pub fn venv_dir(&self) -> PathBuf {
        self.project.join(".venv")
    }

    /// `<project>/.venv/bin/`
    pub fn venv_bin_dir(&self) -> PathBuf {
        self.venv_dir().join("bin")
    }

    /// `<project>/.python-version`
    pub fn python_version_file(&self) -> PathBuf {
        self.project.join(".python-version")
    }

    /// `<project>/.git/HEAD`
    pub fn git_head(&self) -> PathBuf {
        self.project.join(".git").join("HEAD")
    }

    /// `<project>/run_tests.py` — the project test-gate entry point.
    pub fn run_tests_file(&self) -> PathBuf {
        self.project.join("run_tests.py")
    }

    /// `<project>/config/tmp/restart.txt` — touched to restart the app.
    pub fn restart_file(&self) -> PathBuf {
        self.project.join("config").join("tmp").join("restart.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ProjectLayout {
        ProjectLayout::new("/srv/stuff/myapp")
    }

    #[test]
    fn backups_dir_is_sibling_of_project() {
        assert_eq!(
            layout().backups_dir(),
            PathBuf::from("/srv/stuff/requirements_backups")
        );
    }

    #[test]
    fn anchor_is_sibling_of_project() {
        assert_eq!(
            layout().anchor_path(),
            PathBuf::from("/srv/stuff/applied_manifest.bak")
        );
    }

    #[test]
    fn requirements_in_embeds_tier() {
        assert_eq!(
            layout().requirements_in(EnvTier::Staging),
            PathBuf::from("/srv/stuff/myapp/requirements/staging.in")
        );
    }

    #[test]
    fn project_name_is_final_component() {
        assert_eq!(layout().project_name(), "myapp");
    }
}
