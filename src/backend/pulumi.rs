// ABOUTME: SiteBackend implementation driving the Pulumi CLI.
// ABOUTME: Runs stack-scoped subcommands against a YAML-runtime workspace.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::Config;
use crate::types::SiteName;

use super::program::{CONTENT_CONFIG_KEY, SiteProgram, URL_OUTPUT};
use super::{BackendError, SiteBackend};

const PROJECT_FILENAME: &str = "Pulumi.yaml";

/// Captured result of one engine invocation.
#[derive(Debug)]
struct EngineOutput {
    success: bool,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl EngineOutput {
    /// The most useful failure text the engine produced.
    fn message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("engine exited with code {:?}", self.exit_code)
    }
}

/// Drives the `pulumi` binary with a shared project workspace.
///
/// Every site is one stack of the same YAML-runtime project; the page
/// content flows in through stack configuration, so the workspace on disk is
/// written once at preflight and never varies per request.
pub struct PulumiBackend {
    binary: PathBuf,
    work_dir: PathBuf,
    backend_url: String,
    region: String,
    plugin_version: String,
    program: SiteProgram,
}

impl PulumiBackend {
    pub fn new(config: &Config, base: &Path) -> Self {
        let work_dir = config.work_dir(base);
        let backend_url = config
            .engine
            .backend_url
            .clone()
            .unwrap_or_else(|| format!("file://{}", work_dir.join("state").display()));

        Self {
            binary: config.engine.binary.clone(),
            work_dir,
            backend_url,
            region: config.region.clone(),
            plugin_version: config.engine.plugin_version.clone(),
            program: SiteProgram::new(&config.project),
        }
    }

    /// Run one engine subcommand, optionally feeding `stdin`.
    async fn exec(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<EngineOutput, BackendError> {
        tracing::debug!(args = ?args, "running engine command");

        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .arg("--non-interactive")
            .current_dir(&self.work_dir)
            .env("PULUMI_BACKEND_URL", &self.backend_url)
            .env(
                "PULUMI_CONFIG_PASSPHRASE",
                std::env::var("PULUMI_CONFIG_PASSPHRASE").unwrap_or_default(),
            )
            .env("PULUMI_SKIP_UPDATE_CHECK", "true")
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| BackendError::engine(format!("failed to start engine: {e}")))?;

        if let Some(bytes) = stdin
            && let Some(mut handle) = child.stdin.take()
        {
            handle
                .write_all(bytes)
                .await
                .map_err(|e| BackendError::engine(format!("failed to write engine stdin: {e}")))?;
            drop(handle);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| BackendError::engine(format!("engine did not complete: {e}")))?;

        Ok(EngineOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run a subcommand and classify any failure.
    async fn exec_checked(
        &self,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> Result<EngineOutput, BackendError> {
        let output = self.exec(args, stdin).await?;
        if output.success {
            Ok(output)
        } else {
            Err(classify(&output.message()))
        }
    }

    /// Write the workspace the engine runs in: the project file and, for the
    /// default file backend, the state directory.
    async fn write_workspace(&self) -> Result<(), BackendError> {
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| BackendError::engine(format!("failed to create workspace: {e}")))?;

        if let Some(state_dir) = self.backend_url.strip_prefix("file://") {
            tokio::fs::create_dir_all(state_dir)
                .await
                .map_err(|e| BackendError::engine(format!("failed to create state dir: {e}")))?;
        }

        let rendered = self.program.render()?;
        tokio::fs::write(self.work_dir.join(PROJECT_FILENAME), rendered)
            .await
            .map_err(|e| BackendError::engine(format!("failed to write project file: {e}")))?;

        Ok(())
    }

    /// Read a stack's outputs without running a provisioning step.
    async fn outputs(&self, name: &SiteName) -> Result<serde_json::Value, BackendError> {
        let output = self
            .exec_checked(&["stack", "output", "--json", "--stack", name.as_str()], None)
            .await?;

        serde_json::from_str(&output.stdout)
            .map_err(|e| BackendError::engine(format!("malformed stack outputs: {e}")))
    }

    fn endpoint_from(outputs: &serde_json::Value) -> Option<String> {
        outputs
            .get(URL_OUTPUT)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

#[async_trait]
impl SiteBackend for PulumiBackend {
    async fn preflight(&self) -> Result<(), BackendError> {
        let version = self.exec(&["version"], None).await?;
        if !version.success {
            return Err(BackendError::engine(format!(
                "engine binary '{}' is not usable: {}",
                self.binary.display(),
                version.message()
            )));
        }
        tracing::info!(version = %version.stdout.trim(), "provisioning engine found");

        self.write_workspace().await?;

        self.exec_checked(
            &["plugin", "install", "resource", "aws", &self.plugin_version],
            None,
        )
        .await?;
        tracing::info!(plugin = %self.plugin_version, "aws resource plugin installed");

        Ok(())
    }

    async fn ensure(&self, name: &SiteName, content: &Bytes) -> Result<String, BackendError> {
        self.exec_checked(&["stack", "select", name.as_str(), "--create"], None)
            .await?;

        self.exec_checked(
            &[
                "config",
                "set",
                "aws:region",
                &self.region,
                "--stack",
                name.as_str(),
            ],
            None,
        )
        .await?;

        // Value omitted on the command line; the engine reads it from stdin,
        // which keeps large pages off the argument vector.
        let encoded = SiteProgram::encode_content(content);
        self.exec_checked(
            &["config", "set", CONTENT_CONFIG_KEY, "--stack", name.as_str()],
            Some(encoded.as_bytes()),
        )
        .await?;

        self.exec_checked(
            &["up", "--yes", "--skip-preview", "--stack", name.as_str()],
            None,
        )
        .await?;

        let outputs = self.outputs(name).await?;
        Self::endpoint_from(&outputs).ok_or_else(|| {
            BackendError::engine(format!(
                "provisioning run for '{name}' completed without a {URL_OUTPUT} output"
            ))
        })
    }

    async fn inspect(&self, name: &SiteName) -> Result<String, BackendError> {
        let outputs = self.outputs(name).await?;
        // A stack that exists but never converged has no endpoint yet and is
        // indistinguishable from an absent site to callers.
        Self::endpoint_from(&outputs).ok_or(BackendError::NotFound)
    }

    async fn retire(&self, name: &SiteName) -> Result<(), BackendError> {
        self.exec_checked(&["destroy", "--yes", "--stack", name.as_str()], None)
            .await?;

        self.exec_checked(&["stack", "rm", "--yes", "--stack", name.as_str()], None)
            .await?;

        Ok(())
    }

    async fn enumerate(&self) -> Result<Vec<SiteName>, BackendError> {
        let output = self.exec_checked(&["stack", "ls", "--json"], None).await?;

        let entries: Vec<StackSummary> = serde_json::from_str(&output.stdout)
            .map_err(|e| BackendError::engine(format!("malformed stack listing: {e}")))?;

        let mut names = Vec::with_capacity(entries.len());
        for entry in entries {
            match SiteName::new(&entry.name) {
                Ok(name) => names.push(name),
                Err(e) => {
                    tracing::warn!(stack = %entry.name, error = %e, "ignoring stack with non-site name");
                }
            }
        }
        Ok(names)
    }
}

/// One entry of the engine's stack listing.
#[derive(Debug, serde::Deserialize)]
struct StackSummary {
    name: String,
}

/// Map an engine failure message onto the adapter error contract.
///
/// The CLI reports domain conditions only as prose, so this matches the
/// stable phrases the engine has used for them.
fn classify(message: &str) -> BackendError {
    let lower = message.to_lowercase();

    if lower.contains("already exists") {
        BackendError::AlreadyExists
    } else if lower.contains("no stack named") {
        BackendError::NotFound
    } else if lower.contains("currently locked")
        || lower.contains("conflict")
        || lower.contains("update is currently in progress")
    {
        BackendError::InProgress
    } else {
        BackendError::Engine(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_matches_create_collision() {
        let err = classify("error: stack 'site1' already exists");
        assert!(matches!(err, BackendError::AlreadyExists));
    }

    #[test]
    fn classify_matches_missing_stack() {
        let err = classify("error: no stack named 'site1' found");
        assert!(matches!(err, BackendError::NotFound));
    }

    #[test]
    fn classify_matches_engine_lock() {
        for message in [
            "error: the stack is currently locked by 1 lock(s)",
            "error: [409] Conflict: Another update is currently in progress.",
        ] {
            assert!(matches!(classify(message), BackendError::InProgress));
        }
    }

    #[test]
    fn classify_falls_back_to_engine_error() {
        let err = classify("error: could not reach provider endpoint");
        match err {
            BackendError::Engine(msg) => assert!(msg.contains("provider endpoint")),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn default_backend_url_is_file_state_under_work_dir() {
        let config = Config::default();
        let backend = PulumiBackend::new(&config, Path::new("/srv/kiosk"));
        assert_eq!(
            backend.backend_url,
            "file:///srv/kiosk/.kiosk/engine/state"
        );
    }

    #[test]
    fn configured_backend_url_wins() {
        let mut config = Config::default();
        config.engine.backend_url = Some("s3://kiosk-state".to_string());
        let backend = PulumiBackend::new(&config, Path::new("/srv/kiosk"));
        assert_eq!(backend.backend_url, "s3://kiosk-state");
    }

    #[test]
    fn engine_output_message_prefers_stderr() {
        let output = EngineOutput {
            success: false,
            exit_code: Some(255),
            stdout: "progress text".to_string(),
            stderr: "error: boom\n".to_string(),
        };
        assert_eq!(output.message(), "error: boom");

        let quiet = EngineOutput {
            success: false,
            exit_code: Some(255),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(quiet.message().contains("255"));
    }
}
