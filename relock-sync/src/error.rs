//! Error types for relock-sync.

use std::path::PathBuf;

use thiserror::Error;

use relock_store::StoreError;

/// Errors raised while driving external tools or the snapshot store.
///
/// A tool that *ran* and exited nonzero is not an error at this level —
/// that outcome travels as a [`relock_core::CmdOutput`] with `ok == false`
/// so the caller can decide whether it is fatal.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tool could not be spawned at all (missing binary, permissions).
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An error from the snapshot store.
    #[error("snapshot store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
