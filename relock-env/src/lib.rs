//! # relock-env
//!
//! Preflight environment validation and group/permission handling for a
//! managed project. Everything here runs before any mutation, except the
//! best-effort [`fixup`] pass which runs last.

pub mod audit;
pub mod error;
pub mod fixup;
pub mod preflight;

pub use error::PreflightError;
pub use preflight::{hostname, tier_for_hostname, Preflight};
