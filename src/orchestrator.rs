//! Run coordination
//!
//! Drives the whole batch: validate directories → scan the workspace →
//! fetch the AUR index → snapshot + global upstream check → reconcile →
//! process each task sequentially → summarize. Failures in the discovery
//! phases abort the run; failures inside one package's pipeline do not.

use crate::checker::NvcheckerClient;
use crate::config::BuildConfig;
use crate::domain::descriptor::PackageDescriptor;
use crate::domain::result::BuildResult;
use crate::domain::summary::RunSummary;
use crate::error::AppError;
use crate::github::GitHubClient;
use crate::process::CommandRunner;
use crate::progress::Progress;
use crate::reconcile::reconcile;
use crate::registry::{index_by_name, RegistryClient};
use crate::scanner::{discover_packages, DiscoveredPackage};
use crate::srcinfo::load_descriptor;
use crate::updater::PackageUpdater;
use std::collections::HashMap;
use tracing::{error, info, warn};

/// Result of one whole run
pub struct OrchestratorResult {
    /// Per-package outcomes
    pub summary: RunSummary,
    /// Failures outside any package's guarded pipeline
    pub critical_errors: Vec<String>,
}

/// Coordinates one end-to-end update run
pub struct Orchestrator<'a> {
    config: &'a BuildConfig,
    runner: &'a dyn CommandRunner,
    registry: &'a dyn RegistryClient,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a BuildConfig,
        runner: &'a dyn CommandRunner,
        registry: &'a dyn RegistryClient,
    ) -> Self {
        Self {
            config,
            runner,
            registry,
        }
    }

    /// Runs the batch. `Err` means the run never reached the per-package
    /// phase (bad directories, scan failure, AUR fetch failure).
    pub async fn run(&self, show_progress: bool) -> Result<OrchestratorResult, AppError> {
        let mut progress = Progress::new(show_progress);

        self.config.ensure_directories()?;

        // Scan
        progress.spinner("Scanning workspace for PKGBUILDs...");
        let discovered = discover_packages(&self.config.search_root)?;
        progress.finish_and_clear();
        if discovered.is_empty() {
            warn!("no PKGBUILDs found; nothing to do");
            return Ok(OrchestratorResult {
                summary: RunSummary::new(),
                critical_errors: Vec::new(),
            });
        }

        // AUR index
        progress.spinner("Fetching AUR package index...");
        let aur_packages = self
            .registry
            .fetch_maintained_packages(&self.config.maintainer)
            .await?;
        progress.finish_and_clear();
        let aur_index = index_by_name(&aur_packages);

        // Upstream check
        progress.spinner("Checking upstream versions...");
        let mut checker = NvcheckerClient::new(self.runner, &self.config.nvchecker_run_dir);
        checker.write_snapshot(&aur_packages)?;
        checker.write_global_config(&discovered)?;
        if let Some(ref key) = self.config.github_api_key {
            checker.write_keyfile(key)?;
        }
        let update_map = checker.check_all()?;
        progress.finish_and_clear();

        // HashMap order is arbitrary; sort for a stable task order
        let mut updates: Vec<(String, String)> = update_map.into_iter().collect();
        updates.sort();

        let descriptors = self.load_flagged_descriptors(&discovered, &updates);
        let tasks = reconcile(&updates, &descriptors, &aur_index);

        if tasks.is_empty() {
            info!("all packages up to date");
            return Ok(OrchestratorResult {
                summary: RunSummary::new(),
                critical_errors: Vec::new(),
            });
        }

        // Sequential processing; builds are heavyweight and makepkg does
        // not tolerate concurrent runs sharing a pacman database
        let github = GitHubClient::new(self.runner, &self.config.repository, self.config.dry_run);
        let updater = PackageUpdater::new(self.runner, &checker, &github, self.config);

        let mut summary = RunSummary::new();
        let mut critical_errors = Vec::new();
        progress.start(tasks.len() as u64, "Updating packages");
        for task in &tasks {
            progress.set_message(format!("Updating {}", task.name()).as_str());
            match updater.process(task) {
                Ok(result) => summary.add(result),
                Err(e) => {
                    error!(package = %task.name(), error = %e, "critical failure outside the package pipeline");
                    critical_errors.push(format!("{}: {}", task.name(), e));
                    summary.add(
                        BuildResult::new(task.name(), format!("{}", task.current_version()))
                            .fail(format!("update of {} failed", task.name()), e.to_string()),
                    );
                }
            }
            progress.inc();
        }
        progress.finish_and_clear();

        Ok(OrchestratorResult {
            summary,
            critical_errors,
        })
    }

    /// Parses descriptors for flagged packages only.
    ///
    /// The fast path matches a flagged name against the PKGBUILD's
    /// directory name; when that fails (directory named differently from
    /// the package) the remaining PKGBUILDs are parsed once and indexed by
    /// their real name.
    fn load_flagged_descriptors(
        &self,
        discovered: &[DiscoveredPackage],
        updates: &[(String, String)],
    ) -> HashMap<String, PackageDescriptor> {
        let by_dir_name: HashMap<String, &DiscoveredPackage> = discovered
            .iter()
            .filter_map(|p| {
                p.directory
                    .file_name()
                    .map(|n| (n.to_string_lossy().to_string(), p))
            })
            .collect();

        let mut descriptors = HashMap::new();
        let mut unresolved = Vec::new();

        for (name, _) in updates {
            match by_dir_name.get(name) {
                Some(pkg) => match load_descriptor(self.runner, pkg) {
                    Ok(descriptor) => {
                        descriptors.insert(descriptor.name().to_string(), descriptor);
                    }
                    Err(e) => {
                        warn!(package = %name, error = %e, "failed to parse descriptor; package will be skipped");
                    }
                },
                None => unresolved.push(name.clone()),
            }
        }

        if !unresolved.is_empty() {
            // Second pass: parse everything not already covered and match by
            // the name the descriptor actually declares
            for pkg in discovered {
                let dir_name = pkg
                    .directory
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if descriptors.contains_key(&dir_name) {
                    continue;
                }
                match load_descriptor(self.runner, pkg) {
                    Ok(descriptor) => {
                        if unresolved.iter().any(|n| n == descriptor.name()) {
                            descriptors.insert(descriptor.name().to_string(), descriptor);
                        }
                    }
                    Err(e) => {
                        warn!(pkgbuild = %pkg.pkgbuild_path.display(), error = %e, "failed to parse descriptor");
                    }
                }
            }
        }

        descriptors
    }
}
