//! Per-project run lock.
//!
//! Two overlapping scheduled runs against the same project would race on
//! the anchor and backup files, so the whole orchestration takes an
//! exclusive lock file in the backup directory for its duration. The lock
//! is advisory: it guards against a second relock invocation, not against
//! arbitrary writers.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, StoreError};

const LOCK_FILE_NAME: &str = "relock.lock";

/// Held for the duration of one orchestration run; removed on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock inside `backup_dir`, creating the directory if
    /// absent. Fails with [`StoreError::Locked`] if the lock file already
    /// exists.
    pub fn acquire(backup_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(backup_dir).map_err(|e| io_err(backup_dir, e))?;
        let path = backup_dir.join(LOCK_FILE_NAME);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::Locked { path }),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("failed to remove run lock {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn acquire_creates_and_drop_removes() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join(LOCK_FILE_NAME);
        {
            let lock = RunLock::acquire(dir.path()).unwrap();
            assert_eq!(lock.path(), lock_path);
            assert!(lock_path.exists());
        }
        assert!(!lock_path.exists(), "lock must be released on drop");
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = TempDir::new().unwrap();
        let _held = RunLock::acquire(dir.path()).unwrap();
        let second = RunLock::acquire(dir.path());
        assert!(matches!(second, Err(StoreError::Locked { .. })));
    }

    #[test]
    fn acquire_creates_missing_backup_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("requirements_backups");
        let _lock = RunLock::acquire(&nested).unwrap();
        assert!(nested.exists());
    }
}
