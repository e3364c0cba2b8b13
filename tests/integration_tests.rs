//! Integration tests for aurup
//!
//! These tests exercise the pipeline pieces together with a scripted
//! command runner, so no git, makepkg, nvchecker, or gh is required:
//! - workspace discovery feeding descriptor parsing
//! - reconciliation over realistic descriptor/index combinations
//! - the updater state machine, including failure isolation and
//!   the append-only action log

use aurup::checker::NvcheckerClient;
use aurup::cli::CliArgs;
use aurup::config::BuildConfig;
use aurup::domain::descriptor::{AurPackageInfo, DescriptorBuilder, PackageDescriptor};
use aurup::domain::task::UpdateTask;
use aurup::domain::version::PkgVersion;
use aurup::error::BuildToolError;
use aurup::github::GitHubClient;
use aurup::process::{CommandOutput, CommandRunner, CommandSpec};
use aurup::reconcile::reconcile;
use aurup::scanner::discover_packages;
use aurup::srcinfo::load_descriptor;
use aurup::updater::PackageUpdater;
use clap::Parser;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

/// Runner that answers each command from a rule table and records every
/// invocation
struct FakeRunner {
    /// (program, first-arg-substring) → canned output
    rules: Vec<(String, String, CommandOutput)>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    fn new() -> Self {
        Self {
            rules: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn on(mut self, program: &str, arg_substring: &str, output: CommandOutput) -> Self {
        self.rules
            .push((program.to_string(), arg_substring.to_string(), output));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn called_with(&self, fragment: &str) -> bool {
        self.calls().iter().any(|c| c.contains(fragment))
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, BuildToolError> {
        let display = spec.display();
        self.calls.lock().unwrap().push(display.clone());
        for (program, fragment, output) in &self.rules {
            if &spec.program == program && display.contains(fragment.as_str()) {
                return Ok(output.clone());
            }
        }
        Ok(ok(""))
    }
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

fn failing(code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

fn write_package(root: &Path, name: &str, pkgver: &str) -> std::path::PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("PKGBUILD"),
        format!("pkgname={}\npkgver={}\npkgrel=1\n", name, pkgver),
    )
    .unwrap();
    dir
}

fn test_config(workspace: &Path, scratch: &Path, dry_run: bool) -> BuildConfig {
    let mut argv = vec![
        "aurup".to_string(),
        "--repository".to_string(),
        "owner/pkgs".to_string(),
        "--token".to_string(),
        "t0ken".to_string(),
        "--maintainer".to_string(),
        "someone".to_string(),
        "--workspace".to_string(),
        workspace.display().to_string(),
        "--build-dir".to_string(),
        scratch.join("build").display().to_string(),
        "--nvchecker-dir".to_string(),
        scratch.join("nv").display().to_string(),
        "--artifacts-dir".to_string(),
        scratch.join("artifacts").display().to_string(),
    ];
    if dry_run {
        argv.push("--dry-run".to_string());
    }
    let args = CliArgs::parse_from(argv);
    let config = BuildConfig::from_args(&args).unwrap();
    config.ensure_directories().unwrap();
    config
}

fn aur_info(name: &str, version: &str) -> AurPackageInfo {
    AurPackageInfo {
        pkgbase: name.to_string(),
        name: name.to_string(),
        version: PkgVersion::parse(version),
        maintainer: Some("someone".to_string()),
        id: None,
        votes: None,
        popularity: None,
        last_modified: None,
    }
}

mod discovery_and_parsing {
    use super::*;

    const SRCINFO: &str = "pkgbase = foo\n\tpkgver = 1.0\n\tpkgrel = 1\n\tsource = foo.tar.gz\n\npkgname = foo\n";

    #[test]
    fn test_scan_then_parse() {
        let ws = TempDir::new().unwrap();
        write_package(ws.path(), "foo", "1.0");

        let discovered = discover_packages(ws.path()).unwrap();
        assert_eq!(discovered.len(), 1);

        let runner = FakeRunner::new().on("makepkg", "--printsrcinfo", ok(SRCINFO));
        let descriptor = load_descriptor(&runner, &discovered[0]).unwrap();
        assert_eq!(descriptor.name(), "foo");
        assert_eq!(descriptor.pkgver, "1.0");
        assert_eq!(descriptor.directory, discovered[0].directory);
    }

    #[test]
    fn test_srcinfo_failure_is_typed() {
        let ws = TempDir::new().unwrap();
        write_package(ws.path(), "foo", "1.0");
        let discovered = discover_packages(ws.path()).unwrap();

        let runner = FakeRunner::new().on(
            "makepkg",
            "--printsrcinfo",
            failing(4, "PKGBUILD contains a syntax error"),
        );
        let err = load_descriptor(&runner, &discovered[0]).unwrap_err();
        assert!(format!("{}", err).contains("syntax error"));
    }
}

mod reconciliation {
    use super::*;

    fn descriptor(name: &str, pkgver: &str) -> PackageDescriptor {
        DescriptorBuilder::new(format!("/ws/{}/PKGBUILD", name))
            .pkgname(name)
            .pkgver(pkgver)
            .build()
            .unwrap()
    }

    #[test]
    fn test_mixed_batch() {
        let descriptors: HashMap<_, _> = [
            ("stale".to_string(), descriptor("stale", "1.0")),
            ("fresh".to_string(), descriptor("fresh", "2.0")),
        ]
        .into();
        let index: HashMap<_, _> = [
            ("stale".to_string(), aur_info("stale", "1.0-1")),
            ("fresh".to_string(), aur_info("fresh", "2.0-1")),
        ]
        .into();
        let updates = vec![
            ("stale".to_string(), "1.1".to_string()),
            ("fresh".to_string(), "2.0".to_string()),
            ("unknown".to_string(), "9.9".to_string()),
        ];

        let tasks = reconcile(&updates, &descriptors, &index);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name(), "stale");
    }
}

mod updater_pipeline {
    use super::*;

    fn task_for(ws: &Path, name: &str, pkgver: &str, target: &str) -> UpdateTask {
        let dir = write_package(ws, name, pkgver);
        let descriptor = DescriptorBuilder::new(dir.join("PKGBUILD"))
            .pkgbase(name)
            .pkgname(name)
            .pkgver(pkgver)
            .pkgrel("1")
            .source(format!("{}.tar.gz::https://example.com/{}.tar.gz", name, name))
            .build()
            .unwrap();
        UpdateTask {
            descriptor,
            aur_info: Some(aur_info(name, &format!("{}-1", pkgver))),
            target_pkgver: Some(target.to_string()),
        }
    }

    /// git clone in the fake runner has to create the checkout the later
    /// steps operate on; copying the workspace files happens in-process
    struct CloningRunner {
        inner: FakeRunner,
    }

    impl CommandRunner for CloningRunner {
        fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, BuildToolError> {
            if spec.program == "git" && spec.args.first().map(String::as_str) == Some("clone") {
                let target = spec.args.last().unwrap();
                fs::create_dir_all(target).unwrap();
            }
            if spec.program == "makepkg" && spec.args.contains(&"-Lcs".to_string()) {
                // simulate a build artifact and log appearing in the checkout
                let dir = spec.cwd.clone().unwrap();
                let name = dir.file_name().unwrap().to_string_lossy().to_string();
                fs::write(dir.join(format!("{}-built-x86_64.pkg.tar.zst", name)), "pkg").unwrap();
                fs::write(dir.join(format!("{}-build.log", name)), "log").unwrap();
            }
            self.inner.run(spec)
        }
    }

    fn pipeline_runner() -> CloningRunner {
        CloningRunner {
            inner: FakeRunner::new()
                .on("git", "status --porcelain", ok(" M PKGBUILD\n"))
                .on("makepkg", "--printsrcinfo", ok("pkgbase = foo\n\tpkgver = 1.1\n\npkgname = foo\n"))
                .on("gh", "release view", failing(1, "release not found"))
                .on("gh", "api repos", failing(1, "Not Found (HTTP 404)")),
        }
    }

    #[test]
    fn test_successful_update_records_actions() {
        let ws = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let config = test_config(ws.path(), scratch.path(), false);
        let task = task_for(ws.path(), "foo", "1.0", "1.1");

        let runner = pipeline_runner();
        let checker = NvcheckerClient::new(&runner, &config.nvchecker_run_dir);
        let github = GitHubClient::new(&runner, &config.repository, config.dry_run);
        let updater = PackageUpdater::new(&runner, &checker, &github, &config);

        let result = updater.process(&task).unwrap();
        assert!(result.success, "unexpected failure: {:?}", result.error);
        assert_eq!(result.new_version.as_deref(), Some("1.1-1"));
        assert!(result.actions.iter().any(|a| a.contains("cloned")));
        assert!(result.actions.iter().any(|a| a.contains("updated PKGBUILD to 1.1")));
        assert!(result.actions.iter().any(|a| a.contains("pushed to the AUR")));
        assert!(result.actions.iter().any(|a| a.contains("created release foo-1.1-1")));

        // PKGBUILD in the checkout got rewritten before the build
        assert!(runner.inner.called_with("updpkgsums"));
        assert!(runner.inner.called_with("git push"));
        // release carries a human title distinct from the tag
        assert!(runner.inner.called_with("--title foo 1.1-1"));
    }

    #[test]
    fn test_no_change_skips_build_and_publish() {
        let ws = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let config = test_config(ws.path(), scratch.path(), false);
        // target equals current pkgver and the checkout reports no diff
        let task = task_for(ws.path(), "foo", "1.0", "1.0");

        let runner = CloningRunner {
            inner: FakeRunner::new().on("git", "status --porcelain", ok("")),
        };
        let checker = NvcheckerClient::new(&runner, &config.nvchecker_run_dir);
        let github = GitHubClient::new(&runner, &config.repository, config.dry_run);
        let updater = PackageUpdater::new(&runner, &checker, &github, &config);

        let result = updater.process(&task).unwrap();
        assert!(result.success);
        // version recorded as unchanged, not omitted
        assert_eq!(result.new_version.as_deref(), Some("1.0-1"));
        assert_eq!(result.message, "already up to date");
        assert!(!runner.inner.called_with("updpkgsums"));
        assert!(!runner.inner.called_with("git push"));
    }

    #[test]
    fn test_dirty_checkout_without_bump_publishes_but_does_not_build() {
        let ws = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let config = test_config(ws.path(), scratch.path(), false);
        // target equals current pkgver, but the AUR checkout lags behind
        // the workspace files
        let task = task_for(ws.path(), "foo", "1.0", "1.0");

        let runner = CloningRunner {
            inner: FakeRunner::new()
                .on("git", "status --porcelain", ok("?? PKGBUILD\n"))
                .on("gh", "api repos", failing(1, "Not Found (HTTP 404)")),
        };
        let checker = NvcheckerClient::new(&runner, &config.nvchecker_run_dir);
        let github = GitHubClient::new(&runner, &config.repository, config.dry_run);
        let updater = PackageUpdater::new(&runner, &checker, &github, &config);

        let result = updater.process(&task).unwrap();
        assert!(result.success, "unexpected failure: {:?}", result.error);
        assert_eq!(result.new_version.as_deref(), Some("1.0-1"));
        // commit and push happen, build and release do not
        assert!(runner.inner.called_with("git commit"));
        assert!(runner.inner.called_with("git push"));
        assert!(!runner.inner.called_with("updpkgsums"));
        assert!(!runner.inner.called_with("makepkg"));
        assert!(!runner.inner.called_with("release create"));
        assert!(!result.actions.iter().any(|a| a.contains("built")));
        assert!(!result.actions.iter().any(|a| a.contains("created release")));
        assert!(result.built_artifact_paths.is_empty());
    }

    #[test]
    fn test_new_package_without_aur_entry_is_published() {
        let ws = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let config = test_config(ws.path(), scratch.path(), false);
        let mut task = task_for(ws.path(), "newpkg", "1.0", "1.0");
        task.aur_info = None;

        let runner = CloningRunner {
            inner: FakeRunner::new()
                // empty clone of a repository that does not exist yet:
                // everything synced from the workspace is untracked
                .on("git", "status --porcelain", ok("?? PKGBUILD\n"))
                .on("gh", "api repos", failing(1, "Not Found (HTTP 404)")),
        };
        let checker = NvcheckerClient::new(&runner, &config.nvchecker_run_dir);
        let github = GitHubClient::new(&runner, &config.repository, config.dry_run);
        let updater = PackageUpdater::new(&runner, &checker, &github, &config);

        let result = updater.process(&task).unwrap();
        assert!(result.success, "unexpected failure: {:?}", result.error);
        assert_eq!(result.old_version, "1.0-1");
        assert!(runner.inner.called_with("git push"));
    }

    #[test]
    fn test_build_failure_reports_actions_so_far() {
        let ws = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let config = test_config(ws.path(), scratch.path(), false);
        let task = task_for(ws.path(), "foo", "1.0", "1.1");

        let runner = CloningRunner {
            inner: FakeRunner::new()
                .on("git", "status --porcelain", ok(" M PKGBUILD\n"))
                .on("makepkg", "-Lcs", failing(4, "a dependency is missing")),
        };
        let checker = NvcheckerClient::new(&runner, &config.nvchecker_run_dir);
        let github = GitHubClient::new(&runner, &config.repository, config.dry_run);
        let updater = PackageUpdater::new(&runner, &checker, &github, &config);

        let result = updater.process(&task).unwrap();
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("dependency is missing"));
        // clone and rewrite happened before the failure
        assert!(result.actions.iter().any(|a| a.contains("cloned")));
        assert!(result.actions.iter().any(|a| a.contains("updated PKGBUILD")));
        assert!(!runner.inner.called_with("git push"));
    }

    #[test]
    fn test_dry_run_suppresses_push_and_release() {
        let ws = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let config = test_config(ws.path(), scratch.path(), true);
        let task = task_for(ws.path(), "foo", "1.0", "1.1");

        let runner = pipeline_runner();
        let checker = NvcheckerClient::new(&runner, &config.nvchecker_run_dir);
        let github = GitHubClient::new(&runner, &config.repository, config.dry_run);
        let updater = PackageUpdater::new(&runner, &checker, &github, &config);

        let result = updater.process(&task).unwrap();
        assert!(result.success, "unexpected failure: {:?}", result.error);
        // commit still happens locally, push and release do not
        assert!(runner.inner.called_with("git commit"));
        assert!(!runner.inner.called_with("git push"));
        assert!(!runner.inner.called_with("release create"));
    }

    #[test]
    fn test_artifacts_collected() {
        let ws = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let config = test_config(ws.path(), scratch.path(), false);
        let task = task_for(ws.path(), "foo", "1.0", "1.1");

        let runner = pipeline_runner();
        let checker = NvcheckerClient::new(&runner, &config.nvchecker_run_dir);
        let github = GitHubClient::new(&runner, &config.repository, config.dry_run);
        let updater = PackageUpdater::new(&runner, &checker, &github, &config);

        let result = updater.process(&task).unwrap();
        assert!(result.success);
        let collected = config.artifacts_dir.join("foo");
        assert!(collected.join("PKGBUILD").is_file());
        assert!(collected.join(".SRCINFO").is_file());
        let has_pkg = fs::read_dir(&collected)
            .unwrap()
            .flatten()
            .any(|e| e.file_name().to_string_lossy().ends_with(".pkg.tar.zst"));
        assert!(has_pkg);

        // the result points at the collected copies, which outlive the
        // build checkout
        assert_eq!(result.built_artifact_paths.len(), 1);
        assert!(result.built_artifact_paths[0].is_file());
        assert!(result.built_artifact_paths[0].starts_with(&collected));
        assert_eq!(result.collected_log_paths.len(), 1);
        assert!(result.collected_log_paths[0].is_file());
    }
}
