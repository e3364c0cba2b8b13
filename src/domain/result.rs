//! Per-package outcome of a processor run

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of processing one package through the update pipeline.
///
/// The `actions` log is append-only: every completed side effect is recorded
/// so a failed run still reports how far it got.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildResult {
    /// Package name
    pub package: String,
    /// Version before the run, taken from the local PKGBUILD
    pub old_version: String,
    /// Version after the run, when a bump happened
    pub new_version: Option<String>,
    /// Whether the pipeline reached Done without a failure
    pub success: bool,
    /// Ordered record of completed side effects
    pub actions: Vec<String>,
    /// Packages produced by makepkg, as collected under the artifacts dir
    pub built_artifact_paths: Vec<PathBuf>,
    /// Build logs collected alongside the packages
    pub collected_log_paths: Vec<PathBuf>,
    /// Human-readable outcome line
    pub message: String,
    /// Error detail for failed runs
    pub error: Option<String>,
}

impl BuildResult {
    /// Starts a result for a package at its published version
    pub fn new(package: impl Into<String>, old_version: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            old_version: old_version.into(),
            new_version: None,
            success: false,
            actions: Vec::new(),
            built_artifact_paths: Vec::new(),
            collected_log_paths: Vec::new(),
            message: String::new(),
            error: None,
        }
    }

    /// Records a completed side effect
    pub fn record_action(&mut self, action: impl Into<String>) {
        self.actions.push(action.into());
    }

    /// Marks the run successful with a summary message
    pub fn succeed(mut self, message: impl Into<String>) -> Self {
        self.success = true;
        self.message = message.into();
        self.error = None;
        self
    }

    /// Marks the run failed, keeping the actions recorded so far
    pub fn fail(mut self, message: impl Into<String>, error: impl Into<String>) -> Self {
        self.success = false;
        self.message = message.into();
        self.error = Some(error.into());
        self
    }
}
