//! Source-repository and release operations via the `gh` CLI
//!
//! All GitHub access goes through `gh` rather than the REST API directly:
//! the CI environment already has it installed and authenticated through
//! `GH_TOKEN`. Every mutating call honors dry-run.

use crate::error::BuildToolError;
use crate::process::{CommandRunner, CommandSpec};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Response of the contents endpoint, reduced to what we read
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
}

/// GitHub operations needed by the pipeline: file sync into the source
/// repository and release management
pub struct GitHubClient<'a> {
    runner: &'a dyn CommandRunner,
    /// `owner/repo` slug of the source repository
    repo: String,
    dry_run: bool,
}

impl<'a> GitHubClient<'a> {
    /// Creates a client and probes `gh auth status`.
    ///
    /// A failing probe is only a warning; real failures surface on the
    /// first mutating call with a far better error message from gh itself.
    pub fn new(runner: &'a dyn CommandRunner, repo: impl Into<String>, dry_run: bool) -> Self {
        let client = Self {
            runner,
            repo: repo.into(),
            dry_run,
        };
        match client.runner.run(&CommandSpec::new("gh", &["auth", "status"])) {
            Ok(output) if output.success() => debug!("gh auth status ok"),
            Ok(output) => warn!(stderr = %output.stderr.trim(), "gh auth status reported a problem"),
            Err(e) => warn!(error = %e, "could not probe gh auth status"),
        }
        client
    }

    /// Fetches the blob SHA of a file in the source repository.
    ///
    /// `None` means the file does not exist there yet.
    pub fn get_file_sha(&self, repo_path: &str) -> Result<Option<String>, BuildToolError> {
        let endpoint = format!("repos/{}/contents/{}", self.repo, repo_path);
        let output = self
            .runner
            .run(&CommandSpec::new("gh", &["api", &endpoint]))?;

        if !output.success() {
            if output.stderr.contains("Not Found") || output.stderr.contains("404") {
                return Ok(None);
            }
            return Err(BuildToolError::command_failed(
                format!("gh api {}", endpoint),
                output.code,
                output.stderr.trim(),
            ));
        }

        let parsed: ContentsResponse = serde_json::from_str(&output.stdout).map_err(|e| {
            BuildToolError::command_failed(
                format!("gh api {}", endpoint),
                0,
                format!("undecodable contents response: {}", e),
            )
        })?;
        Ok(Some(parsed.sha))
    }

    /// Writes a local file into the source repository via the contents
    /// endpoint.
    ///
    /// Passing the previously fetched SHA makes the PUT conditional: if the
    /// remote changed in between, GitHub rejects the write and the error is
    /// reported as a conflict instead of silently clobbering.
    pub fn update_file(
        &self,
        repo_path: &str,
        local_file: &Path,
        message: &str,
        sha: Option<&str>,
    ) -> Result<(), BuildToolError> {
        if self.dry_run {
            info!(path = repo_path, "dry-run: would sync file to source repository");
            return Ok(());
        }

        let content = fs::read(local_file).map_err(|e| {
            BuildToolError::spawn_failed(format!("read {}", local_file.display()), e.to_string())
        })?;
        let encoded = BASE64.encode(content);

        let endpoint = format!("repos/{}/contents/{}", self.repo, repo_path);
        let message_field = format!("message={}", message);
        let content_field = format!("content={}", encoded);
        let mut args: Vec<&str> = vec![
            "api",
            "-X",
            "PUT",
            &endpoint,
            "-f",
            &message_field,
            "-f",
            &content_field,
        ];
        let sha_field = sha.map(|s| format!("sha={}", s));
        if let Some(ref field) = sha_field {
            args.push("-f");
            args.push(field);
        }

        let output = self.runner.run(&CommandSpec::new("gh", &args))?;
        if !output.success() {
            if output.stderr.contains("409") || output.stderr.contains("does not match") {
                return Err(BuildToolError::conflict(repo_path));
            }
            return Err(BuildToolError::command_failed(
                format!("gh api -X PUT {}", endpoint),
                output.code,
                output.stderr.trim(),
            ));
        }
        info!(path = repo_path, "synced file to source repository");
        Ok(())
    }

    /// True when a release with the given tag already exists
    pub fn release_exists(&self, tag: &str) -> Result<bool, BuildToolError> {
        let output = self.runner.run(&CommandSpec::new(
            "gh",
            &["release", "view", tag, "--repo", &self.repo],
        ))?;
        Ok(output.success())
    }

    /// Deletes a release and its tag
    pub fn delete_release(&self, tag: &str) -> Result<(), BuildToolError> {
        if self.dry_run {
            info!(tag, "dry-run: would delete release");
            return Ok(());
        }
        self.runner
            .run_checked(&CommandSpec::new(
                "gh",
                &[
                    "release",
                    "delete",
                    tag,
                    "--repo",
                    &self.repo,
                    "--cleanup-tag",
                    "--yes",
                ],
            ))
            .map(|_| ())
    }

    /// Creates a release with the given assets attached
    pub fn create_release(
        &self,
        tag: &str,
        title: &str,
        notes: &str,
        assets: &[std::path::PathBuf],
    ) -> Result<(), BuildToolError> {
        if self.dry_run {
            info!(tag, assets = assets.len(), "dry-run: would create release");
            return Ok(());
        }

        let mut args: Vec<String> = vec![
            "release".into(),
            "create".into(),
            tag.into(),
            "--repo".into(),
            self.repo.clone(),
            "--title".into(),
            title.into(),
            "--notes".into(),
            notes.into(),
        ];
        for asset in assets {
            args.push(asset.display().to_string());
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner
            .run_checked(&CommandSpec::new("gh", &arg_refs))
            .map(|_| ())?;
        info!(tag, "created release");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandOutput;
    use std::sync::Mutex;

    /// Scripted runner: pops pre-canned outputs and records the specs it saw
    struct ScriptedRunner {
        outputs: Mutex<Vec<CommandOutput>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        fn new(outputs: Vec<CommandOutput>) -> Self {
            Self {
                outputs: Mutex::new(outputs),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, BuildToolError> {
            self.calls.lock().unwrap().push(spec.display());
            let mut outputs = self.outputs.lock().unwrap();
            if outputs.is_empty() {
                return Ok(CommandOutput {
                    code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                });
            }
            Ok(outputs.remove(0))
        }
    }

    fn ok(stdout: &str) -> CommandOutput {
        CommandOutput {
            code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    fn failed(code: i32, stderr: &str) -> CommandOutput {
        CommandOutput {
            code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_get_file_sha_present() {
        // first output consumed by the auth probe
        let runner = ScriptedRunner::new(vec![ok(""), ok(r#"{"sha": "abc123", "path": "x"}"#)]);
        let client = GitHubClient::new(&runner, "owner/repo", false);
        let sha = client.get_file_sha("pkgs/foo/PKGBUILD").unwrap();
        assert_eq!(sha.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_get_file_sha_absent_is_none() {
        let runner = ScriptedRunner::new(vec![ok(""), failed(1, "gh: Not Found (HTTP 404)")]);
        let client = GitHubClient::new(&runner, "owner/repo", false);
        assert!(client.get_file_sha("pkgs/new/PKGBUILD").unwrap().is_none());
    }

    #[test]
    fn test_get_file_sha_other_failure_is_error() {
        let runner = ScriptedRunner::new(vec![ok(""), failed(1, "gh: Unauthorized (HTTP 401)")]);
        let client = GitHubClient::new(&runner, "owner/repo", false);
        assert!(client.get_file_sha("pkgs/foo/PKGBUILD").is_err());
    }

    #[test]
    fn test_update_file_dry_run_is_noop() {
        let runner = ScriptedRunner::new(vec![ok("")]);
        let client = GitHubClient::new(&runner, "owner/repo", true);
        client
            .update_file("pkgs/foo/PKGBUILD", Path::new("/nope"), "msg", Some("sha"))
            .unwrap();
        // only the auth probe ran
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_update_file_conflict() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let runner = ScriptedRunner::new(vec![
            ok(""),
            failed(1, "HTTP 409: pkgs/foo/PKGBUILD does not match"),
        ]);
        let client = GitHubClient::new(&runner, "owner/repo", false);
        let err = client
            .update_file("pkgs/foo/PKGBUILD", tmp.path(), "msg", Some("oldsha"))
            .unwrap_err();
        assert!(format!("{}", err).contains("conflicting update"));
    }

    #[test]
    fn test_release_exists() {
        let runner = ScriptedRunner::new(vec![ok(""), ok("release info"), failed(1, "not found")]);
        let client = GitHubClient::new(&runner, "owner/repo", false);
        assert!(client.release_exists("foo-1.0").unwrap());
        assert!(!client.release_exists("foo-2.0").unwrap());
    }

    #[test]
    fn test_delete_release_dry_run() {
        let runner = ScriptedRunner::new(vec![ok("")]);
        let client = GitHubClient::new(&runner, "owner/repo", true);
        client.delete_release("foo-1.0").unwrap();
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_create_release_passes_assets() {
        let runner = ScriptedRunner::new(vec![ok(""), ok("")]);
        let client = GitHubClient::new(&runner, "owner/repo", false);
        client
            .create_release(
                "foo-1.1",
                "foo 1.1",
                "automated update",
                &[std::path::PathBuf::from("/out/foo-1.1-1.pkg.tar.zst")],
            )
            .unwrap();
        let calls = runner.calls();
        assert!(calls[1].contains("release create foo-1.1"));
        assert!(calls[1].contains("foo-1.1-1.pkg.tar.zst"));
    }
}
