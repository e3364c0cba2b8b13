//! Command-line interface
//!
//! Everything can be given as a flag, but in CI the values arrive through
//! the environment; each option names its variable.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored text
    Text,
    /// Machine-readable JSON
    Json,
}

/// Automated AUR package updater for CI pipelines
#[derive(Parser, Debug)]
#[command(name = "aurup", version, about, long_about = None)]
pub struct CliArgs {
    /// Source repository slug (owner/repo) holding the PKGBUILDs
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// GitHub token used by the gh CLI
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Checkout of the source repository to scan
    #[arg(long, env = "GITHUB_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// AUR account whose maintained packages are updated
    #[arg(long, env = "AUR_MAINTAINER_NAME")]
    pub maintainer: Option<String>,

    /// Committer name for AUR pushes
    #[arg(long, env = "AUR_GIT_USER_NAME", default_value = "aurup")]
    pub aur_git_user_name: String,

    /// Committer email for AUR pushes
    #[arg(long, env = "AUR_GIT_USER_EMAIL", default_value = "aurup@users.noreply.github.com")]
    pub aur_git_user_email: String,

    /// Base directory for per-package build checkouts
    #[arg(long, env = "PACKAGE_BUILD_BASE_DIR")]
    pub build_dir: Option<PathBuf>,

    /// Working directory for nvchecker inputs and snapshots
    #[arg(long, env = "NVCHECKER_RUN_DIR")]
    pub nvchecker_dir: Option<PathBuf>,

    /// Directory collecting build artifacts and logs
    #[arg(long, env = "ARTIFACTS_DIR")]
    pub artifacts_dir: Option<PathBuf>,

    /// Prefix for generated commit messages
    #[arg(long, env = "COMMIT_MESSAGE_PREFIX", default_value = "CI: Auto update")]
    pub commit_prefix: String,

    /// Subdirectory of the workspace to restrict the PKGBUILD search to
    #[arg(long, env = "PKGBUILD_SEARCH_ROOT_SUFFIX")]
    pub search_root_suffix: Option<String>,

    /// GitHub API key passed to nvchecker for rate-limited sources
    #[arg(long, env = "SECRET_GHUK_VALUE", hide_env_values = true)]
    pub github_api_key: Option<String>,

    /// Log every mutation without pushing, releasing, or writing upstream
    #[arg(long, env = "DRY_RUN_MODE")]
    pub dry_run: bool,

    /// Verbose diagnostic logging
    #[arg(long, env = "DEBUG_MODE")]
    pub debug: bool,

    /// Summary output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
