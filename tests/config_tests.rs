//! Configuration loading tests.
//!
//! These mutate process environment variables, so they run serially.

use serial_test::serial;
use ssm_distributor::config::Config;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "DISTRIBUTOR_BUCKET",
    "DISTRIBUTOR_PACKAGE_NAME",
    "DISTRIBUTOR_PACKAGE_VERSION",
    "DISTRIBUTOR_BUILD_DIR",
    "DISTRIBUTOR_POLL_INTERVAL",
    "DISTRIBUTOR_MAX_WAIT",
    "AWS_REGION",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_explicit_toml_file() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("distributor.toml");
    std::fs::write(
        &path,
        r#"
[package]
name = "Acme-Sensor"
version = "v4.1.0"

[build]
build_dir = "/tmp/acme-builds"

[aws]
bucket = "acme-artifacts"
regions = ["us-east-1", "eu-west-1"]
poll_interval = "2s"
max_wait = "10m"
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.package.name, "Acme-Sensor");
    assert_eq!(config.package.version, "v4.1.0");
    assert_eq!(config.build.build_dir, PathBuf::from("/tmp/acme-builds"));
    assert_eq!(config.aws.bucket.as_deref(), Some("acme-artifacts"));
    assert_eq!(config.aws.regions, vec!["us-east-1", "eu-west-1"]);
    assert_eq!(config.aws.poll_interval, Duration::from_secs(2));
    assert_eq!(config.aws.max_wait, Duration::from_secs(600));
    assert_eq!(config.package.publisher, "Crowdstrike Inc.");
}

#[test]
#[serial]
fn test_yaml_and_json_files() {
    clear_env();
    let temp = TempDir::new().unwrap();

    let yaml = temp.path().join("config.yaml");
    std::fs::write(&yaml, "aws:\n  bucket: yaml-bucket\nlogging:\n  json: true\n").unwrap();
    let config = Config::load(Some(&yaml)).unwrap();
    assert_eq!(config.aws.bucket.as_deref(), Some("yaml-bucket"));
    assert!(config.logging.json);

    let json = temp.path().join("config.json");
    std::fs::write(&json, r#"{"package": {"version": "v7"}}"#).unwrap();
    let config = Config::load(Some(&json)).unwrap();
    assert_eq!(config.package.version, "v7");
    assert!(config.aws.bucket.is_none());
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[aws]\nbucket = \"file-bucket\"\n").unwrap();

    std::env::set_var("DISTRIBUTOR_BUCKET", "env-bucket");
    std::env::set_var("DISTRIBUTOR_PACKAGE_VERSION", "v5.0.0");
    std::env::set_var("DISTRIBUTOR_POLL_INTERVAL", "250ms");
    std::env::set_var("AWS_REGION", "eu-north-1");

    let config = Config::load(Some(&path)).unwrap();
    clear_env();

    assert_eq!(config.aws.bucket.as_deref(), Some("env-bucket"));
    assert_eq!(config.package.version, "v5.0.0");
    assert_eq!(config.aws.poll_interval, Duration::from_millis(250));
    assert_eq!(config.aws.region.as_deref(), Some("eu-north-1"));
}

#[test]
#[serial]
fn test_invalid_duration_env_is_ignored() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("empty.toml");
    std::fs::write(&path, "").unwrap();

    std::env::set_var("DISTRIBUTOR_MAX_WAIT", "forever");
    let config = Config::load(Some(&path)).unwrap();
    clear_env();

    assert_eq!(config.aws.max_wait, Duration::from_secs(15 * 60));
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.toml");
    std::fs::write(&path, "[aws\nbucket = ").unwrap();

    assert!(Config::load(Some(&path)).is_err());
}
