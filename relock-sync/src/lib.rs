//! # relock-sync
//!
//! The update orchestration core: the rollback-capable sync engine, the
//! `uv` toolchain driver, SMTP notification, and the top-level
//! [`orchestrator::run`] sequencing.
//!
//! Call [`orchestrator::run`] with a [`Collaborators`] wiring to perform a
//! full compile → compare → sync → verify → report pass for one project.

pub mod engine;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod uv;

pub use engine::{Installer, SyncEngine, SyncReport, SyncState, TestGate};
pub use error::SyncError;
pub use notify::Notifier;
pub use orchestrator::{run, Collaborators, UpdateError, UpdateOutcome};
pub use uv::Uv;
