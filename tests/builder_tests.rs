//! End-to-end package builds on a temporary directory.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use ssm_distributor::archive::sha256_file;
use ssm_distributor::builder::PackageBuilder;
use ssm_distributor::distro::DistroTable;
use ssm_distributor::manifest::Manifest;
use ssm_distributor::script::ScriptSet;
use std::fs::{self, File};
use std::io::Read;
use tempfile::TempDir;

fn write_scripts(dir: &std::path::Path) {
    fs::create_dir_all(dir.join("linux")).unwrap();
    fs::create_dir_all(dir.join("windows")).unwrap();
    fs::write(
        dir.join("linux/install.sh"),
        "#!/bin/bash\nfilter=\"<<SENSOR_DOWNLOAD_FILTER>>\"\nmanager=<<PACKAGE_MANAGER>>\n",
    )
    .unwrap();
    fs::write(dir.join("linux/uninstall.sh"), "#!/bin/bash\nmanager=<<PACKAGE_MANAGER>>\n").unwrap();
    fs::write(dir.join("windows/install.ps1"), "$filter = \"<<SENSOR_DOWNLOAD_FILTER>>\"\n").unwrap();
    fs::write(dir.join("windows/uninstall.ps1"), "Write-Output 'uninstall'\n").unwrap();
}

#[test]
fn test_builtin_table_builds_every_distro() {
    let temp = TempDir::new().unwrap();
    let table = DistroTable::builtin().unwrap();
    let expected = table.len();

    let output = PackageBuilder::new(table.clone(), ScriptSet::builtin(), temp.path())
        .version("v1.0.0")
        .build()
        .unwrap();

    assert_eq!(output.artifacts.len(), expected);
    assert_eq!(output.manifest.file_count(), expected);
    for (_, distro) in table.iter() {
        let zip = output.s3_dir.join(format!("{}.zip", distro.package_dir_name()));
        assert!(zip.exists(), "missing {}", zip.display());
    }

    let written = Manifest::from_file(&output.manifest_path()).unwrap();
    assert_eq!(written, output.manifest);
}

#[test]
fn test_checksums_match_zips() {
    let temp = TempDir::new().unwrap();
    let output = PackageBuilder::new(small_table(), ScriptSet::builtin(), temp.path())
        .build()
        .unwrap();

    for artifact in &output.artifacts {
        let file = format!("{}.zip", artifact.distro_dir);
        assert_eq!(sha256_file(&artifact.zip_path).unwrap(), artifact.sha256);
        assert_eq!(output.manifest.files[&file].checksums.sha256, artifact.sha256);
    }
}

#[test]
fn test_custom_scripts_are_rendered_into_zips() {
    let temp = TempDir::new().unwrap();
    let scripts_dir = temp.path().join("scripts");
    write_scripts(&scripts_dir);
    let scripts = ScriptSet::from_dir(&scripts_dir).unwrap();

    let output = PackageBuilder::new(small_table(), scripts, temp.path().join("builds"))
        .build()
        .unwrap();

    let zip_path = output.s3_dir.join("ubuntu22-x86_64.zip");
    let mut archive = zip::ZipArchive::new(File::open(zip_path).unwrap()).unwrap();
    let mut install = String::new();
    archive
        .by_name("install.sh")
        .unwrap()
        .read_to_string(&mut install)
        .unwrap();

    assert_eq!(
        install,
        "#!/bin/bash\nfilter=\"os:'Ubuntu'+os_version:'22*'+platform:'linux'\"\nmanager=dpkg\n"
    );
    assert_eq!(archive.len(), 2);
}

#[test]
fn test_manifest_metadata() {
    let temp = TempDir::new().unwrap();
    let output = PackageBuilder::new(small_table(), ScriptSet::builtin(), temp.path())
        .version("v9.9.9")
        .publisher("Example Security")
        .description("Test sensor")
        .build()
        .unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.manifest_path()).unwrap()).unwrap();
    assert_eq!(json["schemaVersion"], "2.0");
    assert_eq!(json["publisher"], "Example Security");
    assert_eq!(json["description"], "Test sensor");
    assert_eq!(json["version"], "v9.9.9");
    assert_eq!(
        json["packages"]["windows"]["_any"]["_any"]["file"],
        "windows-_any.zip"
    );
}

#[test]
fn test_table_file_round_trip_through_builder() {
    let temp = TempDir::new().unwrap();
    let path = write_small_table(temp.path());
    let table = DistroTable::from_file(&path).unwrap();

    let output = PackageBuilder::new(table, ScriptSet::builtin(), temp.path().join("out"))
        .build()
        .unwrap();
    let names: Vec<_> = output.artifacts.iter().map(|a| a.distro_dir.as_str()).collect();
    assert_eq!(names, vec!["ubuntu22-x86_64", "windows-_any"]);
}
