//! nvchecker integration
//!
//! nvchecker is the authority on "is there a newer upstream version". This
//! module prepares its inputs (oldver snapshot, aggregated config, keyfile)
//! and parses its two output shapes: the JSON event stream of a global run
//! and the plain stderr of a single-package run.

use crate::domain::descriptor::AurPackageInfo;
use crate::error::{BuildToolError, IoError};
use crate::process::{CommandRunner, CommandSpec};
use crate::scanner::DiscoveredPackage;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One line of the `--logger json` event stream
#[derive(Debug, Deserialize)]
struct CheckEvent {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// `[keys]` table of a keyfile
#[derive(Debug, Serialize)]
struct Keyfile<'a> {
    keys: BTreeMap<&'static str, &'a str>,
}

/// Driver for nvchecker runs in a dedicated working directory
pub struct NvcheckerClient<'a> {
    runner: &'a dyn CommandRunner,
    run_dir: PathBuf,
    keyfile: Option<PathBuf>,
}

impl<'a> NvcheckerClient<'a> {
    /// Creates a client rooted at the given run directory
    pub fn new(runner: &'a dyn CommandRunner, run_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            run_dir: run_dir.into(),
            keyfile: None,
        }
    }

    /// Path of the oldver snapshot
    pub fn oldver_path(&self) -> PathBuf {
        self.run_dir.join("aur.json")
    }

    /// Path of the aggregated global config
    pub fn config_path(&self) -> PathBuf {
        self.run_dir.join("new.toml")
    }

    /// Writes the oldver snapshot from the AUR index.
    ///
    /// nvchecker compares upstream versions against pkgver only; pkgrel and
    /// epoch are packaging-side counters.
    pub fn write_snapshot(&self, packages: &[AurPackageInfo]) -> Result<(), IoError> {
        let snapshot: BTreeMap<&str, &str> = packages
            .iter()
            .map(|p| (p.name.as_str(), p.version.pkgver.as_str()))
            .collect();
        let path = self.oldver_path();
        let body = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| IoError::generic(&path, std::io::Error::other(e)))?;
        fs::write(&path, body).map_err(|e| IoError::generic(&path, e))?;
        info!(count = snapshot.len(), path = %path.display(), "wrote oldver snapshot");
        Ok(())
    }

    /// Aggregates per-package `.nvchecker.toml` files into the global config
    /// with an `[__config__]` header pointing at the snapshot files
    pub fn write_global_config(&self, packages: &[DiscoveredPackage]) -> Result<usize, IoError> {
        let path = self.config_path();
        let mut body = format!(
            "[__config__]\noldver = \"{}\"\nnewver = \"{}\"\n",
            self.oldver_path().display(),
            self.run_dir.join("new.json").display(),
        );

        let mut included = 0;
        for pkg in packages {
            let Some(ref config) = pkg.nvchecker_config else {
                continue;
            };
            let content = fs::read_to_string(config).map_err(|e| IoError::generic(config, e))?;
            body.push('\n');
            body.push_str(content.trim_end());
            body.push('\n');
            included += 1;
        }

        fs::write(&path, body).map_err(|e| IoError::generic(&path, e))?;
        info!(included, path = %path.display(), "aggregated nvchecker config");
        Ok(included)
    }

    /// Writes the keyfile (mode 0600) when a GitHub API key is available and
    /// arms subsequent runs with it
    pub fn write_keyfile(&mut self, github_key: &str) -> Result<(), IoError> {
        let path = self.run_dir.join("keyfile.toml");
        let mut keys = BTreeMap::new();
        keys.insert("github", github_key);
        let body = toml::to_string(&Keyfile { keys })
            .map_err(|e| IoError::generic(&path, std::io::Error::other(e)))?;
        fs::write(&path, body).map_err(|e| IoError::generic(&path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .map_err(|e| IoError::generic(&path, e))?;
        }

        self.keyfile = Some(path);
        Ok(())
    }

    /// Runs the global check and returns name → new upstream version for
    /// every package nvchecker reports as updated.
    ///
    /// A non-zero exit or individual error events degrade to warnings; a
    /// partially failing batch still yields the updates it did find.
    pub fn check_all(&self) -> Result<HashMap<String, String>, BuildToolError> {
        let config = self.config_path();
        let mut args: Vec<String> = vec![
            "-c".into(),
            config.display().to_string(),
            "--logger".into(),
            "json".into(),
        ];
        if let Some(ref keyfile) = self.keyfile {
            args.push("-k".into());
            args.push(keyfile.display().to_string());
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self
            .runner
            .run(&CommandSpec::new("nvchecker", &arg_refs).cwd(&self.run_dir))?;

        if !output.success() {
            warn!(code = output.code, "nvchecker exited non-zero; using partial results");
        }

        let updates = parse_event_stream(&output.stdout);
        info!(updated = updates.len(), "global upstream check complete");
        Ok(updates)
    }

    /// Runs nvchecker against a single package config and returns the
    /// version it reports, when any
    pub fn check_single(
        &self,
        config: &Path,
        package: &str,
    ) -> Result<Option<String>, BuildToolError> {
        let config_arg = config.display().to_string();
        let mut args: Vec<String> = vec!["-c".into(), config_arg];
        if let Some(ref keyfile) = self.keyfile {
            args.push("-k".into());
            args.push(keyfile.display().to_string());
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self
            .runner
            .run(&CommandSpec::new("nvchecker", &arg_refs).cwd(&self.run_dir))?;

        if !output.success() {
            warn!(package, code = output.code, "single-package nvchecker run exited non-zero");
        }

        let version = parse_single_output(&output.stderr);
        debug!(package, ?version, "single-package check");
        Ok(version)
    }
}

/// Extracts updated versions from the `--logger json` event stream,
/// tolerating malformed lines and error events
pub fn parse_event_stream(stdout: &str) -> HashMap<String, String> {
    let mut updates = HashMap::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: CheckEvent = match serde_json::from_str(line) {
            Ok(e) => e,
            Err(_) => {
                debug!(line, "skipping non-JSON checker output line");
                continue;
            }
        };
        match event.event.as_deref() {
            Some("updated") => {
                if let (Some(name), Some(version)) = (event.name, event.version) {
                    updates.insert(name, version);
                }
            }
            Some("error") => {
                warn!(name = ?event.name, "upstream check reported an error for one entry");
            }
            _ => {}
        }
    }
    updates
}

/// Parses the default-logger stderr of a single-package run.
///
/// "updated to X" wins over "current X" when both appear.
pub fn parse_single_output(stderr: &str) -> Option<String> {
    // unwrap: both patterns are literals, verified by tests
    let updated = Regex::new(r":\s*updated to\s+([^\s,]+)").unwrap();
    let current = Regex::new(r":\s*current\s+([^\s,]+)").unwrap();

    if let Some(caps) = updated.captures(stderr) {
        return Some(caps[1].to_string());
    }
    current.captures(stderr).map(|caps| caps[1].to_string())
}
