//! Configuration module for ssm-distributor
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/ssm-distributor/config.toml)
//! - User configuration (~/.ssm-distributor.toml)
//! - Project configuration (./ssm-distributor.toml)
//! - Environment variables
//! - Command-line arguments

use crate::builder::{DEFAULT_DESCRIPTION, DEFAULT_PUBLISHER};
use crate::deploy::{DEFAULT_MAX_WAIT, DEFAULT_PACKAGE_NAME, DEFAULT_PACKAGE_VERSION, DEFAULT_POLL_INTERVAL};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Package identity and manifest metadata
    pub package: PackageConfig,

    /// Local build inputs and output
    pub build: BuildConfig,

    /// AWS publishing settings
    pub aws: AwsConfig,

    /// Logging and output settings
    pub logging: LoggingConfig,
}

/// Package identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Distributor package (document) name
    pub name: String,

    /// Package version name
    pub version: String,

    /// Manifest publisher
    pub publisher: String,

    /// Manifest description
    pub description: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PACKAGE_NAME.to_string(),
            version: DEFAULT_PACKAGE_VERSION.to_string(),
            publisher: DEFAULT_PUBLISHER.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }
}

/// Build settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Distro table; the builtin table when unset
    pub distros: Option<PathBuf>,

    /// Script directory; the builtin scripts when unset
    pub scripts: Option<PathBuf>,

    /// Root of the build output
    pub build_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            distros: None,
            scripts: None,
            build_dir: PathBuf::from("./builds"),
        }
    }
}

/// AWS settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Artifact bucket
    pub bucket: Option<String>,

    /// Region for S3 and the default credential chain
    pub region: Option<String>,

    /// Target regions; every enabled region when empty
    pub regions: Vec<String>,

    /// Delay between document status checks
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Maximum time to wait for documents to become active
    #[serde(with = "humantime_serde")]
    pub max_wait: Duration,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            region: None,
            regions: vec![],
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter used when neither `-v` nor `RUST_LOG` is given
    pub level: Option<String>,

    /// Emit JSON log lines
    pub json: bool,

    /// Colored terminal output
    pub color: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            json: false,
            color: true,
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Explicit path takes priority
        if let Some(path) = explicit_path {
            paths.push(path.clone());
            return paths;
        }

        paths.push(PathBuf::from("/etc/ssm-distributor/config.toml"));

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".ssm-distributor.toml"));
        }

        paths.push(PathBuf::from("ssm-distributor.toml"));

        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; `other` wins where it differs
    /// from the defaults
    fn merge(&self, other: Config) -> Config {
        let defaults = Config::default();

        fn pick<T: PartialEq + Clone>(base: &T, other: T, default: &T) -> T {
            if &other != default {
                other
            } else {
                base.clone()
            }
        }

        Config {
            package: PackageConfig {
                name: pick(&self.package.name, other.package.name, &defaults.package.name),
                version: pick(&self.package.version, other.package.version, &defaults.package.version),
                publisher: pick(
                    &self.package.publisher,
                    other.package.publisher,
                    &defaults.package.publisher,
                ),
                description: pick(
                    &self.package.description,
                    other.package.description,
                    &defaults.package.description,
                ),
            },
            build: BuildConfig {
                distros: other.build.distros.or_else(|| self.build.distros.clone()),
                scripts: other.build.scripts.or_else(|| self.build.scripts.clone()),
                build_dir: pick(&self.build.build_dir, other.build.build_dir, &defaults.build.build_dir),
            },
            aws: AwsConfig {
                bucket: other.aws.bucket.or_else(|| self.aws.bucket.clone()),
                region: other.aws.region.or_else(|| self.aws.region.clone()),
                regions: if other.aws.regions.is_empty() {
                    self.aws.regions.clone()
                } else {
                    other.aws.regions
                },
                poll_interval: pick(
                    &self.aws.poll_interval,
                    other.aws.poll_interval,
                    &defaults.aws.poll_interval,
                ),
                max_wait: pick(&self.aws.max_wait, other.aws.max_wait, &defaults.aws.max_wait),
            },
            logging: LoggingConfig {
                level: other.logging.level.or_else(|| self.logging.level.clone()),
                json: other.logging.json || self.logging.json,
                color: other.logging.color && self.logging.color,
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(bucket) = std::env::var("DISTRIBUTOR_BUCKET") {
            self.aws.bucket = Some(bucket);
        }

        if let Ok(name) = std::env::var("DISTRIBUTOR_PACKAGE_NAME") {
            self.package.name = name;
        }

        if let Ok(version) = std::env::var("DISTRIBUTOR_PACKAGE_VERSION") {
            self.package.version = version;
        }

        if let Ok(dir) = std::env::var("DISTRIBUTOR_BUILD_DIR") {
            self.build.build_dir = PathBuf::from(dir);
        }

        if let Ok(interval) = std::env::var("DISTRIBUTOR_POLL_INTERVAL") {
            match humantime_serde::re::humantime::parse_duration(&interval) {
                Ok(d) => self.aws.poll_interval = d,
                Err(e) => tracing::warn!("Ignoring DISTRIBUTOR_POLL_INTERVAL={}: {}", interval, e),
            }
        }

        if let Ok(max_wait) = std::env::var("DISTRIBUTOR_MAX_WAIT") {
            match humantime_serde::re::humantime::parse_duration(&max_wait) {
                Ok(d) => self.aws.max_wait = d,
                Err(e) => tracing::warn!("Ignoring DISTRIBUTOR_MAX_WAIT={}: {}", max_wait, e),
            }
        }

        if let Ok(region) = std::env::var("AWS_REGION") {
            self.aws.region = Some(region);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.logging.color = false;
        }
    }

    /// Load from a specific file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.package.name, "CrowdStrike-FalconSensor");
        assert_eq!(config.package.version, "v1.0.0");
        assert_eq!(config.build.build_dir, PathBuf::from("./builds"));
        assert_eq!(config.aws.poll_interval, Duration::from_secs(5));
        assert_eq!(config.aws.max_wait, Duration::from_secs(900));
        assert!(config.logging.color);
    }

    #[test]
    fn test_config_merge() {
        let base = Config {
            aws: AwsConfig {
                bucket: Some("base-bucket".into()),
                regions: vec!["us-east-1".into()],
                ..AwsConfig::default()
            },
            ..Config::default()
        };
        let other = Config {
            package: PackageConfig {
                version: "v2.0.0".into(),
                ..PackageConfig::default()
            },
            ..Config::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.package.version, "v2.0.0");
        assert_eq!(merged.aws.bucket.as_deref(), Some("base-bucket"));
        assert_eq!(merged.aws.regions, vec!["us-east-1".to_string()]);
    }

    #[test]
    fn test_toml_durations() {
        let config: Config = toml::from_str(
            r#"
            [aws]
            poll_interval = "10s"
            max_wait = "30m"
            "#,
        )
        .unwrap();
        assert_eq!(config.aws.poll_interval, Duration::from_secs(10));
        assert_eq!(config.aws.max_wait, Duration::from_secs(1800));
        assert_eq!(config.package, PackageConfig::default());
    }
}
