//! # relock-diff
//!
//! Pure change classification over dependency manifests and their diffs.
//! No I/O happens anywhere in this crate; every function operates on text
//! passed in by the caller, so the classifiers are unit-testable against
//! literal strings.
//!
//! Two levels of classification:
//! - [`compare_manifests`] — did the manifest body change at all, ignoring
//!   leading comment noise (generation timestamps, the active marker)?
//! - [`find_version_change`] — did one named package's pinned version
//!   change inside a unified diff?

pub mod lockdiff;
pub mod manifest;

pub use lockdiff::{find_version_change, VersionChange};
pub use manifest::{compare_manifests, DiffResult};
