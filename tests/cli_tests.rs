//! CLI tests for ssm-distributor
//!
//! Runs the binary with assert_cmd in an isolated working directory and
//! home so no user or project configuration leaks in.

mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use tempfile::TempDir;

fn distributor_cmd(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ssm-distributor").unwrap();
    cmd.current_dir(temp.path())
        .env("HOME", temp.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("DISTRIBUTOR_CONFIG")
        .env_remove("DISTRIBUTOR_BUILD_DIR")
        .env_remove("DISTRIBUTOR_PACKAGE_VERSION");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    distributor_cmd(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("distros"));
}

#[test]
fn test_version_flag() {
    let temp = TempDir::new().unwrap();
    distributor_cmd(&temp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_distros_uses_builtin_table() {
    let temp = TempDir::new().unwrap();
    distributor_cmd(&temp)
        .arg("distros")
        .assert()
        .success()
        .stdout(predicate::str::contains("amazon2023-arm64"))
        .stdout(predicate::str::contains("windows-_any"));
}

#[test]
fn test_distros_prefers_local_table_as_json() {
    let temp = TempDir::new().unwrap();
    write_small_table(temp.path());

    let output = distributor_cmd(&temp)
        .args(["distros", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let packages: Vec<_> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["package"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(packages, vec!["ubuntu22-x86_64", "windows-_any"]);
}

#[test]
fn test_build_writes_packages_and_manifest() {
    let temp = TempDir::new().unwrap();
    let distros = write_small_table(temp.path());

    distributor_cmd(&temp)
        .arg("build")
        .arg("--version")
        .arg("v2.5.0")
        .arg("--distros")
        .arg(&distros)
        .arg("--build-dir")
        .arg(temp.path().join("builds"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Built 2 packages"));

    let s3 = temp.path().join("builds/s3");
    assert!(s3.join("ubuntu22-x86_64.zip").exists());
    assert!(s3.join("windows-_any.zip").exists());
    assert!(temp.path().join("builds/package/ubuntu22-x86_64/install.sh").exists());

    let manifest = std::fs::read_to_string(s3.join("manifest.json")).unwrap();
    assert!(manifest.contains("\"version\": \"v2.5.0\""));
}

#[test]
fn test_build_default_build_dir() {
    let temp = TempDir::new().unwrap();
    write_small_table(temp.path());

    distributor_cmd(&temp)
        .args(["build", "--version", "v1.0.0"])
        .assert()
        .success();

    assert!(temp.path().join("builds/s3/manifest.json").exists());
}

#[test]
fn test_build_with_empty_table_fails() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("distros.json"), "{}").unwrap();

    distributor_cmd(&temp)
        .args(["build", "--version", "v1.0.0"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains(
            "expected distros.json to contain distro information",
        ));
}

#[test]
fn test_build_with_missing_table_fails() {
    let temp = TempDir::new().unwrap();

    distributor_cmd(&temp)
        .args(["build", "--version", "v1.0.0", "--distros", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.json"));
}

#[test]
fn test_build_with_missing_scripts_fails() {
    let temp = TempDir::new().unwrap();
    write_small_table(temp.path());
    std::fs::create_dir_all(temp.path().join("scripts")).unwrap();

    distributor_cmd(&temp)
        .args(["build", "--version", "v1.0.0", "--scripts", "scripts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("install.sh"));
}

#[test]
fn test_unknown_subcommand() {
    let temp = TempDir::new().unwrap();
    distributor_cmd(&temp).arg("deploy-everything").assert().failure();
}
