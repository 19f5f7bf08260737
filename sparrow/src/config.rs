//! `SparrowConfig`: a config file merged with `clap`-parsed flags and env
//! overrides (§6 "Sparrow configuration"). Not part of the core's public
//! contract — it exists because a runnable binary needs an entry point.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Command-line flags; `--config` is the only required one, everything
/// else overrides the file.
#[derive(Debug, Clone, Parser)]
#[command(name = "sparrow", about = "Distributed infrastructure monitoring agent")]
pub struct Cli {
    /// Path to the YAML (or JSON) sparrow configuration file.
    #[arg(long, env = "SPARROW_CONFIG")]
    pub config: PathBuf,
    /// Overrides `sparrowName` from the config file.
    #[arg(long, env = "SPARROW_NAME")]
    pub name: Option<String>,
    /// Overrides `apiAddress` from the config file.
    #[arg(long, env = "SPARROW_API_ADDRESS")]
    pub api_address: Option<String>,
}

/// Root configuration, assembled from a file plus CLI/env overrides.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SparrowConfig {
    pub sparrow_name: String,
    pub api_address: String,
    pub loader: LoaderSettings,
    pub target_manager: TargetManagerSettings,
}

impl SparrowConfig {
    /// Read `cli.config`, decode it, then apply CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let path = cli.config.display().to_string();
        let body = std::fs::read(&cli.config).map_err(|source| ConfigError::Read { path: path.clone(), source })?;
        let mut config: SparrowConfig =
            serde_yaml::from_slice(&body).map_err(|source| ConfigError::Parse { path, source })?;

        if let Some(name) = &cli.name {
            config.sparrow_name = name.clone();
        }
        if let Some(api_address) = &cli.api_address {
            config.api_address = api_address.clone();
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    Http,
    File,
}

/// `loader{type,interval,http{…}|file{…}}` (§6).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderSettings {
    #[serde(rename = "type")]
    pub kind: LoaderKind,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    pub http: Option<HttpLoaderSettings>,
    pub file: Option<FileLoaderSettings>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpLoaderSettings {
    pub url: String,
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub timeout: Duration,
    pub token: Option<String>,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLoaderSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetManagerKind {
    Git,
    Gitlab,
}

/// `targetManager{type, checkInterval, registrationInterval,
/// updateInterval, unhealthyThreshold, scheme, git|gitlab{…}}` (§6).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetManagerSettings {
    #[serde(rename = "type")]
    pub kind: TargetManagerKind,
    #[serde(with = "humantime_serde")]
    pub check_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub registration_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub update_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub unhealthy_threshold: Duration,
    pub scheme: String,
    pub git: Option<GitSettings>,
    pub gitlab: Option<GitlabSettings>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSettings {
    pub remote_url: String,
    pub branch: Option<String>,
    pub path: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitlabSettings {
    pub base_url: String,
    pub project_id: String,
    pub token: String,
    pub branch: Option<String>,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> &'static str {
        r#"
sparrowName: sparrow-eu-1
apiAddress: "0.0.0.0:8080"
loader:
  type: file
  interval: 30s
  file:
    path: /etc/sparrow/runtime-config.yaml
targetManager:
  type: git
  checkInterval: 1m
  registrationInterval: 30s
  updateInterval: 1m
  unhealthyThreshold: 5m
  scheme: https
  git:
    remoteUrl: https://git.example.com/sparrow/registry.git
    path: registry
"#
    }

    #[test]
    fn parses_sample_config() {
        let config: SparrowConfig = serde_yaml::from_str(sample()).unwrap();
        assert_eq!(config.sparrow_name, "sparrow-eu-1");
        assert_eq!(config.loader.kind, LoaderKind::File);
        assert_eq!(config.target_manager.kind, TargetManagerKind::Git);
        assert_eq!(config.target_manager.check_interval, Duration::from_secs(60));
    }

    #[test]
    fn cli_overrides_take_precedence_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparrow.yaml");
        std::fs::write(&path, sample()).unwrap();
        let cli = Cli {
            config: path,
            name: Some("sparrow-override".into()),
            api_address: None,
        };
        let config = SparrowConfig::load(&cli).unwrap();
        assert_eq!(config.sparrow_name, "sparrow-override");
        assert_eq!(config.api_address, "0.0.0.0:8080");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let cli = Cli {
            config: PathBuf::from("/nonexistent/sparrow.yaml"),
            name: None,
            api_address: None,
        };
        assert!(matches!(SparrowConfig::load(&cli), Err(ConfigError::Read { .. })));
    }
}
