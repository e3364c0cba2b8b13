//! Validated runtime configuration
//!
//! CLI/environment input is turned into a typed `BuildConfig` before any
//! work starts; a missing required value fails the whole run up front
//! rather than mid-batch.

use crate::cli::CliArgs;
use crate::error::{ConfigError, IoError};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Fully validated configuration for one run
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Source repository slug (owner/repo)
    pub repository: String,
    /// Checkout of the source repository
    pub workspace: PathBuf,
    /// Directory under the workspace actually scanned for PKGBUILDs
    pub search_root: PathBuf,
    /// AUR maintainer account
    pub maintainer: String,
    /// Committer identity for AUR pushes
    pub aur_git_user_name: String,
    pub aur_git_user_email: String,
    /// Base directory for per-package build checkouts
    pub build_base_dir: PathBuf,
    /// nvchecker working directory
    pub nvchecker_run_dir: PathBuf,
    /// Artifact collection directory
    pub artifacts_dir: PathBuf,
    /// Commit message prefix
    pub commit_prefix: String,
    /// Optional GitHub API key for nvchecker
    pub github_api_key: Option<String>,
    /// Mutations suppressed when set
    pub dry_run: bool,
    /// Verbose logging
    pub debug: bool,
}

impl BuildConfig {
    /// Validates CLI/environment input into a configuration.
    ///
    /// Required: repository, workspace (must be an existing directory),
    /// maintainer, and a token unless dry-run.
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let repository = args
            .repository
            .clone()
            .ok_or_else(|| ConfigError::missing_required("GITHUB_REPOSITORY"))?;
        let workspace = args
            .workspace
            .clone()
            .ok_or_else(|| ConfigError::missing_required("GITHUB_WORKSPACE"))?;
        let maintainer = args
            .maintainer
            .clone()
            .ok_or_else(|| ConfigError::missing_required("AUR_MAINTAINER_NAME"))?;
        if args.token.is_none() && !args.dry_run {
            return Err(ConfigError::missing_required("GH_TOKEN"));
        }

        if !workspace.is_dir() {
            return Err(ConfigError::invalid_path(
                "GITHUB_WORKSPACE",
                &workspace,
                "not an existing directory",
            ));
        }

        let search_root = match &args.search_root_suffix {
            Some(suffix) => workspace.join(suffix),
            None => workspace.clone(),
        };
        if !search_root.is_dir() {
            return Err(ConfigError::invalid_path(
                "PKGBUILD_SEARCH_ROOT_SUFFIX",
                &search_root,
                "not an existing directory",
            ));
        }

        let temp = std::env::temp_dir();
        Ok(Self {
            repository,
            search_root,
            maintainer,
            aur_git_user_name: args.aur_git_user_name.clone(),
            aur_git_user_email: args.aur_git_user_email.clone(),
            build_base_dir: args
                .build_dir
                .clone()
                .unwrap_or_else(|| temp.join("aurup-build")),
            nvchecker_run_dir: args
                .nvchecker_dir
                .clone()
                .unwrap_or_else(|| temp.join("aurup-nvchecker")),
            artifacts_dir: args
                .artifacts_dir
                .clone()
                .unwrap_or_else(|| workspace.join("artifacts")),
            commit_prefix: args.commit_prefix.clone(),
            github_api_key: args.github_api_key.clone(),
            dry_run: args.dry_run,
            debug: args.debug,
            workspace,
        })
    }

    /// Creates the working directories this run needs
    pub fn ensure_directories(&self) -> Result<(), IoError> {
        for dir in [
            &self.build_base_dir,
            &self.nvchecker_run_dir,
            &self.artifacts_dir,
        ] {
            fs::create_dir_all(dir).map_err(|e| IoError::create_dir(dir, e))?;
        }
        info!(
            build = %self.build_base_dir.display(),
            nvchecker = %self.nvchecker_run_dir.display(),
            artifacts = %self.artifacts_dir.display(),
            "working directories ready"
        );
        Ok(())
    }

    /// Path of a file relative to the workspace, for contents-API sync
    pub fn repo_relative(&self, path: &std::path::Path) -> Option<String> {
        path.strip_prefix(&self.workspace)
            .ok()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
    }
}
