//! # relock-store
//!
//! Timestamped manifest snapshots for one project's backup directory:
//! creation, retention pruning, active marking, and the per-run lock.

pub mod error;
pub mod lock;
pub mod snapshot;

pub use error::StoreError;
pub use lock::RunLock;
pub use snapshot::{ManifestSnapshot, SnapshotStore, ACTIVE_MARKER};
