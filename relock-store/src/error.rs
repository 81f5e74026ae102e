//! Error types for relock-store.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from snapshot-store operations.
///
/// These are environment failures (permissions, disk full, a concurrent
/// run), not business-logic failures; callers are expected to let them
/// halt the run.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another run holds the per-project lock.
    #[error("another relock run holds the lock at {path}")]
    Locked { path: PathBuf },
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
