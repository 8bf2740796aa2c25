// ABOUTME: Configuration types and parsing for kiosk.yml.
// ABOUTME: Handles YAML parsing, discovery, and template generation.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "kiosk.yml";
pub const CONFIG_FILENAME_ALT: &str = "kiosk.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".kiosk/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Project name scoping every stack the control plane manages.
    #[serde(default = "default_project")]
    pub project: String,

    /// Cloud region the site buckets are provisioned in.
    #[serde(default = "default_region")]
    pub region: String,

    /// Address the HTTP control plane listens on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Upper bound for a single provisioning run. A run that exceeds this
    /// is reported as a failure; the engine may still converge it later.
    #[serde(default = "default_run_timeout", with = "humantime_serde")]
    pub run_timeout: Duration,

    #[serde(default)]
    pub engine: EngineConfig,
}

/// Settings for the provisioning engine the backend adapter drives.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub kind: BackendKind,

    /// Engine executable.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Workspace directory for the rendered project and local state.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Engine state backend URL. Defaults to a file backend under work_dir.
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Cloud resource plugin version installed during preflight.
    #[serde(default = "default_plugin_version")]
    pub plugin_version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            binary: default_binary(),
            work_dir: None,
            backend_url: None,
            plugin_version: default_plugin_version(),
        }
    }
}

/// Which backend adapter implementation serves provisioning requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Drive the Pulumi CLI against real cloud resources.
    #[default]
    Pulumi,
    /// In-memory backend for tests and local dry runs.
    Memory,
}

fn default_project() -> String {
    "kiosk".to_string()
}

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_run_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_binary() -> PathBuf {
    PathBuf::from("pulumi")
}

fn default_plugin_version() -> String {
    "v3.23.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: default_project(),
            region: default_region(),
            listen: default_listen(),
            run_timeout: default_run_timeout(),
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Engine workspace directory, resolved against `base` when relative.
    pub fn work_dir(&self, base: &Path) -> PathBuf {
        let dir = self
            .engine
            .work_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".kiosk/engine"));
        if dir.is_absolute() {
            dir
        } else {
            base.join(dir)
        }
    }
}

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, template_yaml())?;

    Ok(())
}

fn template_yaml() -> String {
    let defaults = Config::default();
    format!(
        r#"project: {}
region: {}
listen: {}
run_timeout: 10m
engine:
  kind: pulumi
  binary: pulumi
"#,
        defaults.project, defaults.region, defaults.listen
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.project, "kiosk");
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.listen, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.run_timeout, Duration::from_secs(600));
        assert_eq!(config.engine.kind, BackendKind::Pulumi);
    }

    #[test]
    fn template_parses_back() {
        let config = Config::from_yaml(&template_yaml()).unwrap();
        assert_eq!(config.run_timeout, Duration::from_secs(600));
        assert_eq!(config.engine.binary, PathBuf::from("pulumi"));
    }

    #[test]
    fn parses_full_config() {
        let yaml = r#"
project: sites
region: eu-central-1
listen: 0.0.0.0:9000
run_timeout: 90s
engine:
  kind: memory
  work_dir: /var/lib/kiosk
  backend_url: file:///var/lib/kiosk/state
  plugin_version: v3.24.1
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.project, "sites");
        assert_eq!(config.region, "eu-central-1");
        assert_eq!(config.run_timeout, Duration::from_secs(90));
        assert_eq!(config.engine.kind, BackendKind::Memory);
        assert_eq!(
            config.engine.backend_url.as_deref(),
            Some("file:///var/lib/kiosk/state")
        );
    }

    #[test]
    fn work_dir_resolves_relative_paths() {
        let config = Config::default();
        let dir = config.work_dir(Path::new("/srv/app"));
        assert_eq!(dir, PathBuf::from("/srv/app/.kiosk/engine"));
    }

    #[test]
    fn work_dir_keeps_absolute_paths() {
        let mut config = Config::default();
        config.engine.work_dir = Some(PathBuf::from("/var/lib/kiosk"));
        let dir = config.work_dir(Path::new("/srv/app"));
        assert_eq!(dir, PathBuf::from("/var/lib/kiosk"));
    }

    #[test]
    fn rejects_unknown_backend_kind() {
        let yaml = "engine:\n  kind: terraform\n";
        assert!(Config::from_yaml(yaml).is_err());
    }
}
