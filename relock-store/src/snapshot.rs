//! Timestamped manifest snapshots.
//!
//! Snapshots live in one backup directory per project as
//! `<tier>_<YYYY-MM-DDTHH-MM-SS>.txt`. The timestamp format is fixed-width
//! and zero-padded, so lexicographic order on the filename is
//! chronological order; listing and pruning rely on that.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use relock_core::EnvTier;

use crate::error::{io_err, StoreError};

/// Marker line prepended to a snapshot once the environment applies it.
pub const ACTIVE_MARKER: &str = "# ACTIVE";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";
const SNAPSHOT_EXTENSION: &str = "txt";

// ---------------------------------------------------------------------------
// ManifestSnapshot
// ---------------------------------------------------------------------------

/// One retained manifest artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSnapshot {
    pub path: PathBuf,
    pub tier: EnvTier,
    /// Second-precision creation timestamp as embedded in the filename.
    pub timestamp: String,
}

impl ManifestSnapshot {
    /// Parse a snapshot from its path; `None` for files that are not
    /// `<tier>_<timestamp>.txt`.
    fn from_path(path: &Path) -> Option<Self> {
        if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXTENSION) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let (tier_label, timestamp) = stem.split_once('_')?;
        let tier: EnvTier = tier_label.parse().ok()?;
        Some(Self {
            path: path.to_path_buf(),
            tier,
            timestamp: timestamp.to_string(),
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}.{}", self.tier, self.timestamp, SNAPSHOT_EXTENSION)
    }

    pub fn read_to_string(&self) -> Result<String, StoreError> {
        fs::read_to_string(&self.path).map_err(|e| io_err(&self.path, e))
    }

    /// Whether this snapshot carries the leading active marker.
    pub fn is_active(&self) -> Result<bool, StoreError> {
        let content = self.read_to_string()?;
        Ok(content.lines().next() == Some(ACTIVE_MARKER))
    }
}

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

/// Manages the snapshot set rooted at one backup directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a path for a new snapshot, creating the backup directory if
    /// absent. The file itself is written by the caller (typically the
    /// resolver's `--output-file`).
    pub fn allocate(&self, tier: EnvTier) -> Result<ManifestSnapshot, StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let snapshot = ManifestSnapshot {
            path: self
                .dir
                .join(format!("{tier}_{timestamp}.{SNAPSHOT_EXTENSION}")),
            tier,
            timestamp,
        };
        Ok(snapshot)
    }

    /// Write a new timestamped snapshot with the given content.
    pub fn create(&self, tier: EnvTier, content: &str) -> Result<ManifestSnapshot, StoreError> {
        let snapshot = self.allocate(tier)?;
        fs::write(&snapshot.path, content).map_err(|e| io_err(&snapshot.path, e))?;
        tracing::debug!("created snapshot {}", snapshot.path.display());
        Ok(snapshot)
    }

    /// All snapshots, newest first (descending filename order).
    pub fn list(&self) -> Result<Vec<ManifestSnapshot>, StoreError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let mut snapshots: Vec<ManifestSnapshot> = fs::read_dir(&self.dir)
            .map_err(|e| io_err(&self.dir, e))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| ManifestSnapshot::from_path(&entry.path()))
            .collect();
        snapshots.sort_by(|a, b| b.path.file_name().cmp(&a.path.file_name()));
        Ok(snapshots)
    }

    /// The most recent snapshot, if any.
    pub fn latest(&self) -> Result<Option<ManifestSnapshot>, StoreError> {
        Ok(self.list()?.into_iter().next())
    }

    /// The second most recent snapshot — the comparison baseline for a
    /// freshly compiled candidate.
    pub fn previous(&self) -> Result<Option<ManifestSnapshot>, StoreError> {
        Ok(self.list()?.into_iter().nth(1))
    }

    /// Delete all but the `keep_recent` most recent snapshots.
    ///
    /// Returns the removed paths. The newest snapshots are never touched.
    pub fn prune(&self, keep_recent: usize) -> Result<Vec<PathBuf>, StoreError> {
        let snapshots = self.list()?;
        let mut removed = Vec::new();
        for old in snapshots.into_iter().skip(keep_recent) {
            tracing::debug!("removing old snapshot {}", old.path.display());
            fs::remove_file(&old.path).map_err(|e| io_err(&old.path, e))?;
            removed.push(old.path);
        }
        Ok(removed)
    }

    /// Prepend the active marker to `snapshot` in place.
    ///
    /// This is the only permitted mutation of an existing snapshot; it
    /// records which artifact the environment currently applies.
    pub fn mark_active(&self, snapshot: &ManifestSnapshot) -> Result<(), StoreError> {
        let content = snapshot.read_to_string()?;
        let marked = format!("{ACTIVE_MARKER}\n{content}");
        fs::write(&snapshot.path, marked).map_err(|e| io_err(&snapshot.path, e))?;
        tracing::info!("marked active: {}", snapshot.path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
