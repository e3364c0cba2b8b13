//! aurup: CI-driven AUR package updater
//!
//! Scans a workspace for PKGBUILDs, cross-references them against the AUR
//! by maintainer, detects upstream releases with nvchecker, rebuilds stale
//! packages with makepkg, and publishes the results (AUR push, GitHub
//! release, source-repo sync).

pub mod checker;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod github;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod process;
pub mod progress;
pub mod reconcile;
pub mod registry;
pub mod scanner;
pub mod srcinfo;
pub mod updater;

pub use error::AppError;
