//! Aggregate summary of a whole run

use crate::domain::result::BuildResult;
use serde::{Deserialize, Serialize};

/// Collection of per-package results with aggregate accessors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    results: Vec<BuildResult>,
}

impl RunSummary {
    /// Creates an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one package result
    pub fn add(&mut self, result: BuildResult) {
        self.results.push(result);
    }

    /// All results in processing order
    pub fn results(&self) -> &[BuildResult] {
        &self.results
    }

    /// Number of packages processed
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Number of successful packages
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Number of failed packages
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    /// True when at least one package failed
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| !r.success)
    }

    /// Iterator over failed results only
    pub fn failures(&self) -> impl Iterator<Item = &BuildResult> {
        self.results.iter().filter(|r| !r.success)
    }
}
