//! ---
//! mcr_section: "01-core-functionality"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Shared primitives and utilities for the handler runtime."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

fn default_region() -> String {
    "us-east-1".to_owned()
}

fn default_delivery_attempts() -> u32 {
    5
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

/// Primary configuration object for the MCR runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Region used when a resource kind cannot derive one from its properties.
    #[serde(default = "default_region")]
    pub default_region: String,
    /// Result-envelope delivery tuning.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Logging output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Result-envelope delivery tuning.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Maximum attempts to PUT the result envelope to the callback address.
    #[serde(default = "default_delivery_attempts")]
    pub max_attempts: u32,
    /// Per-request timeout for the callback PUT.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_http_timeout")]
    pub http_timeout: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_delivery_attempts(),
            http_timeout: default_http_timeout(),
        }
    }
}

/// Logging output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory receiving the rolling daily log file.
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    /// Optional file prefix; defaults to the service name.
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            file_prefix: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_region: default_region(),
            delivery: DeliveryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    /// The parsed configuration.
    pub config: AppConfig,
    /// Path the configuration was read from; `None` means built-in defaults.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    /// Environment variable overriding the candidate search.
    pub const ENV_CONFIG_PATH: &str = "MCR_CONFIG";

    /// Load configuration from disk, respecting the `MCR_CONFIG` override.
    /// Falls back to built-in defaults when no candidate file exists.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!("no configuration files found; using built-in defaults");
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            serde_yaml::from_str::<AppConfig>(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        } else {
            toml::from_str::<AppConfig>(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.default_region.trim().is_empty() {
            return Err(anyhow!("default_region must not be empty"));
        }
        if self.delivery.max_attempts == 0 {
            return Err(anyhow!("delivery.max_attempts must be at least 1"));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config validates");
        assert_eq!(config.delivery.max_attempts, 5);
        assert_eq!(config.delivery.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn parses_partial_toml() {
        let config: AppConfig = "default_region = \"eu-west-1\"\n\n[delivery]\nmax_attempts = 3\n"
            .parse()
            .expect("parse");
        assert_eq!(config.default_region, "eu-west-1");
        assert_eq!(config.delivery.max_attempts, 3);
        assert_eq!(config.logging.directory, default_logging_directory());
    }

    #[test]
    fn rejects_zero_attempts() {
        let err = "[delivery]\nmax_attempts = 0\n".parse::<AppConfig>().unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn loads_from_candidate_file() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        std::fs::write(file.path(), "default_region = \"ap-south-1\"\n").expect("write");
        let loaded = AppConfig::load_with_source(&[file.path()]).expect("load");
        assert_eq!(loaded.config.default_region, "ap-south-1");
        assert_eq!(loaded.source.as_deref(), Some(file.path()));
    }

    #[test]
    fn loads_yaml_by_extension() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("mcr.yaml");
        std::fs::write(&path, "default_region: eu-central-1\ndelivery:\n  max_attempts: 2\n")
            .expect("write");
        let loaded = AppConfig::load_with_source(&[&path]).expect("load");
        assert_eq!(loaded.config.default_region, "eu-central-1");
        assert_eq!(loaded.config.delivery.max_attempts, 2);
    }

    #[test]
    fn missing_candidates_fall_back_to_defaults() {
        let loaded =
            AppConfig::load_with_source(&[PathBuf::from("does/not/exist.toml")]).expect("load");
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.default_region, default_region());
    }
}
