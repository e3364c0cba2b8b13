//! Per-package update pipeline
//!
//! One `process` call takes a task through clone, sync, version check,
//! PKGBUILD rewrite, build, artifact collection, AUR publish, release and
//! source-repo sync. Failures inside the pipeline are caught at this
//! boundary and reported as a failed `BuildResult`; one broken package
//! never stops its siblings.

use crate::checker::NvcheckerClient;
use crate::config::BuildConfig;
use crate::domain::result::BuildResult;
use crate::domain::task::UpdateTask;
use crate::domain::version::PkgVersion;
use crate::error::{AppError, BuildToolError, IoError};
use crate::github::GitHubClient;
use crate::process::{run_in, CommandRunner, CommandSpec};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// AUR ssh remote prefix
const AUR_GIT_URL: &str = "ssh://aur@aur.archlinux.org";

static BUILD_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique working directory for one package build, removed on drop.
///
/// Cleanup must not depend on the pipeline outcome, and no step may rely on
/// the process working directory; every command receives this path
/// explicitly.
pub struct BuildDir {
    path: PathBuf,
}

impl BuildDir {
    /// Creates a fresh directory under `base`
    pub fn create(base: &Path, package: &str) -> Result<Self, IoError> {
        let unique = format!(
            "{}-{}-{}",
            package,
            std::process::id(),
            BUILD_DIR_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let path = base.join(unique);
        fs::create_dir_all(&path).map_err(|e| IoError::create_dir(&path, e))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BuildDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove build directory");
        }
    }
}

/// Drives the update pipeline for individual packages
pub struct PackageUpdater<'a> {
    runner: &'a dyn CommandRunner,
    checker: &'a NvcheckerClient<'a>,
    github: &'a GitHubClient<'a>,
    config: &'a BuildConfig,
}

impl<'a> PackageUpdater<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        checker: &'a NvcheckerClient<'a>,
        github: &'a GitHubClient<'a>,
        config: &'a BuildConfig,
    ) -> Self {
        Self {
            runner,
            checker,
            github,
            config,
        }
    }

    /// Processes one task end to end.
    ///
    /// `Ok` carries the per-package outcome, failed or not. `Err` is
    /// reserved for failures before the guarded pipeline starts (the build
    /// directory itself could not be created).
    pub fn process(&self, task: &UpdateTask) -> Result<BuildResult, AppError> {
        let name = task.name().to_string();
        let old_version = format!("{}", task.current_version());
        let mut result = BuildResult::new(&name, &old_version);

        info!(package = %name, old = %old_version, "processing package");

        let build_dir = BuildDir::create(&self.config.build_base_dir, &name)?;

        match self.run_pipeline(task, &build_dir, &mut result) {
            Ok(()) => Ok(result),
            Err(e) => {
                warn!(package = %name, error = %e, "package update failed");
                Ok(result.fail(format!("update of {} failed", name), e.to_string()))
            }
        }
    }

    fn run_pipeline(
        &self,
        task: &UpdateTask,
        build_dir: &BuildDir,
        result: &mut BuildResult,
    ) -> Result<(), AppError> {
        let name = task.name();
        let descriptor = &task.descriptor;
        let clone_dir = build_dir.path().join(&descriptor.pkgbase);

        // Clone
        let remote = format!("{}/{}.git", AUR_GIT_URL, descriptor.pkgbase);
        let clone_target = clone_dir.display().to_string();
        self.runner.run_checked(
            &CommandSpec::new("git", &["clone", remote.as_str(), clone_target.as_str()])
                .cwd(build_dir.path()),
        )?;
        result.record_action(format!("cloned {}", remote));

        // Sync workspace files over the AUR checkout
        copy_tree(&descriptor.directory, &clone_dir)?;
        result.record_action("synced workspace files into AUR checkout");

        // Commit identity, repo-local only
        run_in(
            self.runner,
            &clone_dir,
            "git",
            &["config", "user.name", self.config.aur_git_user_name.as_str()],
        )?;
        run_in(
            self.runner,
            &clone_dir,
            "git",
            &["config", "user.email", self.config.aur_git_user_email.as_str()],
        )?;

        // Version check: a package-specific nvchecker result replaces the
        // global target
        let mut target = task.target_pkgver.clone();
        if let Some(ref checker_config) = descriptor.nvchecker_config {
            if let Some(version) = self.checker.check_single(checker_config, name)? {
                debug!(package = %name, version = %version, "package-specific check result takes precedence");
                target = Some(version);
            }
        }

        // Rewrite pkgver/pkgrel when a bump is due
        let pkgbuild_path = clone_dir.join("PKGBUILD");
        let mut bumped = false;
        if let Some(ref target) = target {
            if target != &descriptor.pkgver {
                let content = fs::read_to_string(&pkgbuild_path)
                    .map_err(|e| IoError::generic(&pkgbuild_path, e))?;
                let (rewritten, changed) = rewrite_version(&content, target);
                if changed {
                    fs::write(&pkgbuild_path, rewritten)
                        .map_err(|e| IoError::generic(&pkgbuild_path, e))?;
                    result.record_action(format!("updated PKGBUILD to {}", target));
                    bumped = true;
                } else {
                    warn!(package = %name, "no pkgver line found; PKGBUILD left untouched");
                }
            }
        }

        // Anything to publish at all?
        let status = run_in(self.runner, &clone_dir, "git", &["status", "--porcelain"])?;
        if status.stdout.trim().is_empty() {
            info!(package = %name, "no changes; skipping build");
            result.new_version = Some(format!("{}", descriptor.version()));
            *result = result.clone().succeed("already up to date");
            return Ok(());
        }

        let new_version = PkgVersion {
            epoch: descriptor.epoch.clone(),
            pkgver: if bumped {
                target.clone().unwrap_or_else(|| descriptor.pkgver.clone())
            } else {
                descriptor.pkgver.clone()
            },
            pkgrel: if bumped {
                "1".to_string()
            } else {
                descriptor.pkgrel.clone()
            },
        };

        // Build and collect only for an actual version bump; dirty files
        // without a bump are committed and pushed as-is
        if bumped {
            run_in(self.runner, &clone_dir, "updpkgsums", &[])?;
            let srcinfo = run_in(self.runner, &clone_dir, "makepkg", &["--printsrcinfo"])?;
            let srcinfo_path = clone_dir.join(".SRCINFO");
            fs::write(&srcinfo_path, &srcinfo.stdout)
                .map_err(|e| IoError::generic(&srcinfo_path, e))?;
            run_in(
                self.runner,
                &clone_dir,
                "makepkg",
                &["-Lcs", "--noconfirm", "--needed", "--noprogressbar"],
            )?;
            result.record_action(format!("built {}", new_version));

            let artifacts = find_artifacts(&clone_dir, &descriptor.pkgbase, name)?;

            // Collect artifacts; the built packages and logs survive in the
            // artifacts dir after the build checkout is removed
            let collect_dir = self.config.artifacts_dir.join(name);
            fs::create_dir_all(&collect_dir).map_err(|e| IoError::create_dir(&collect_dir, e))?;
            let logs = find_by_suffix(&clone_dir, ".log");
            let mut collected = vec![pkgbuild_path.clone(), srcinfo_path.clone()];
            collected.extend(artifacts.iter().cloned());
            collected.extend(logs.iter().cloned());
            for file in &collected {
                if let Some(file_name) = file.file_name() {
                    let dest = collect_dir.join(file_name);
                    fs::copy(file, &dest).map_err(|e| IoError::copy(file, &dest, e))?;
                }
            }
            for artifact in &artifacts {
                if let Some(file_name) = artifact.file_name() {
                    result.built_artifact_paths.push(collect_dir.join(file_name));
                }
            }
            for log in &logs {
                if let Some(file_name) = log.file_name() {
                    result.collected_log_paths.push(collect_dir.join(file_name));
                }
            }
            result.record_action(format!("collected {} artifacts", collected.len()));
        }

        // Publish to the AUR
        self.publish_aur(task, &clone_dir, &new_version, result)?;

        // GitHub release with the built packages attached
        if bumped {
            self.create_release(name, &new_version, result)?;
        }

        // Sync changed descriptor files back to the source repository
        self.sync_source_files(task, &clone_dir, &new_version, result)?;

        result.new_version = Some(format!("{}", new_version));
        let message = if bumped {
            format!("updated {} to {}", name, new_version)
        } else {
            format!("published local changes for {} at {}", name, new_version)
        };
        *result = result.clone().succeed(message);
        Ok(())
    }

    fn publish_aur(
        &self,
        task: &UpdateTask,
        clone_dir: &Path,
        new_version: &PkgVersion,
        result: &mut BuildResult,
    ) -> Result<(), AppError> {
        let descriptor = &task.descriptor;

        // only stage what actually exists; a fresh AUR repository may not
        // have a .SRCINFO yet when no build ran
        let mut to_stage: Vec<String> = ["PKGBUILD", ".SRCINFO"]
            .into_iter()
            .filter(|f| clone_dir.join(*f).is_file())
            .map(str::to_string)
            .collect();
        for source in &descriptor.sources {
            // source entries like `name::url` carry the local name left of ::
            let entry = source.split("::").next().unwrap_or(source);
            if entry.contains("://") || entry.starts_with("git+") {
                continue;
            }
            if clone_dir.join(entry).is_file() {
                to_stage.push(entry.to_string());
            }
        }

        let mut add_args = vec!["add", "--"];
        add_args.extend(to_stage.iter().map(String::as_str));
        run_in(self.runner, clone_dir, "git", &add_args)?;

        let message = format!(
            "{}: {} to v{}",
            self.config.commit_prefix,
            task.name(),
            new_version
        );
        run_in(self.runner, clone_dir, "git", &["commit", "-m", message.as_str()])?;
        result.record_action(format!("committed: {}", message));

        if self.config.dry_run {
            info!(package = %task.name(), "dry-run: would push to the AUR");
        } else {
            run_in(self.runner, clone_dir, "git", &["push"])?;
            result.record_action("pushed to the AUR");
        }
        Ok(())
    }

    fn create_release(
        &self,
        name: &str,
        new_version: &PkgVersion,
        result: &mut BuildResult,
    ) -> Result<(), AppError> {
        let tag = format!("{}-{}", name, new_version);
        if self.github.release_exists(&tag)? {
            warn!(tag = %tag, "release already exists; recreating");
            self.github.delete_release(&tag)?;
        }
        let title = format!("{} {}", name, new_version);
        let notes = format!("Automated update of {} to {}", name, new_version);
        let assets = result.built_artifact_paths.clone();
        self.github.create_release(&tag, &title, &notes, &assets)?;
        result.record_action(format!("created release {}", tag));
        Ok(())
    }

    fn sync_source_files(
        &self,
        task: &UpdateTask,
        clone_dir: &Path,
        new_version: &PkgVersion,
        result: &mut BuildResult,
    ) -> Result<(), AppError> {
        let descriptor = &task.descriptor;
        for file_name in ["PKGBUILD", ".SRCINFO"] {
            let local = clone_dir.join(file_name);
            if !local.is_file() {
                continue;
            }
            let workspace_path = descriptor.directory.join(file_name);
            let Some(repo_path) = self.config.repo_relative(&workspace_path) else {
                warn!(path = %workspace_path.display(), "file outside the workspace; not syncing");
                continue;
            };
            let sha = self.github.get_file_sha(&repo_path)?;
            let message = format!(
                "{}: sync {} for {} v{}",
                self.config.commit_prefix,
                file_name,
                task.name(),
                new_version
            );
            self.github
                .update_file(&repo_path, &local, &message, sha.as_deref())?;
            result.record_action(format!("synced {} to source repository", file_name));
        }
        Ok(())
    }
}

/// Rewrites `pkgver=` to the target and resets `pkgrel=` to 1.
///
/// Both anchors match at line start only; `_pkgver=` style variables are
/// untouched. When the file has no `pkgrel=` line one is inserted directly
/// after the rewritten `pkgver=`. Returns the new content and whether
/// anything changed.
pub fn rewrite_version(content: &str, target: &str) -> (String, bool) {
    let mut lines: Vec<String> = Vec::new();
    let mut changed = false;
    let mut saw_pkgrel = false;
    let mut pkgver_index = None;

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("pkgver=") {
            if rest != target {
                lines.push(format!("pkgver={}", target));
                changed = true;
            } else {
                lines.push(line.to_string());
            }
            pkgver_index = Some(lines.len() - 1);
        } else if line.starts_with("pkgrel=") {
            saw_pkgrel = true;
            if line != "pkgrel=1" {
                lines.push("pkgrel=1".to_string());
                changed = true;
            } else {
                lines.push(line.to_string());
            }
        } else {
            lines.push(line.to_string());
        }
    }

    if changed && !saw_pkgrel {
        if let Some(index) = pkgver_index {
            lines.insert(index + 1, "pkgrel=1".to_string());
        }
    }

    let mut rewritten = lines.join("\n");
    if content.ends_with('\n') {
        rewritten.push('\n');
    }
    (rewritten, changed)
}

/// Locates built packages, widening the pattern until something matches:
/// `{pkgbase}*.pkg.tar.zst`, then `{name}*.pkg.tar.zst`, then any
/// `*.pkg.tar.zst`. Zero matches after a successful build is fatal.
pub fn find_artifacts(
    dir: &Path,
    pkgbase: &str,
    name: &str,
) -> Result<Vec<PathBuf>, BuildToolError> {
    let all: Vec<PathBuf> = find_by_suffix(dir, ".pkg.tar.zst");
    let matches = |prefix: &str| -> Vec<PathBuf> {
        all.iter()
            .filter(|p| {
                p.file_name()
                    .map(|f| f.to_string_lossy().starts_with(prefix))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    };

    let by_base = matches(pkgbase);
    if !by_base.is_empty() {
        return Ok(by_base);
    }
    let by_name = matches(name);
    if !by_name.is_empty() {
        return Ok(by_name);
    }
    if !all.is_empty() {
        return Ok(all);
    }
    Err(BuildToolError::no_artifacts(name))
}

fn find_by_suffix(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .map(|f| f.to_string_lossy().ends_with(suffix))
                    .unwrap_or(false)
        })
        .collect();
    found.sort();
    found
}

/// Recursive copy of `src` into `dst`, overwriting existing files and
/// recreating symlinks as symlinks
pub fn copy_tree(src: &Path, dst: &Path) -> Result<(), IoError> {
    fs::create_dir_all(dst).map_err(|e| IoError::create_dir(dst, e))?;
    let entries = fs::read_dir(src).map_err(|e| IoError::generic(src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| IoError::generic(src, e))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| IoError::generic(&from, e))?;

        if file_type.is_symlink() {
            let link_target = fs::read_link(&from).map_err(|e| IoError::generic(&from, e))?;
            if to.exists() || to.symlink_metadata().is_ok() {
                let _ = fs::remove_file(&to);
            }
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link_target, &to)
                .map_err(|e| IoError::copy(&from, &to, e))?;
        } else if file_type.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| IoError::copy(&from, &to, e))?;
        }
    }
    Ok(())
}
