//! Local package build.
//!
//! For every distro in the table the builder renders the platform's
//! install/uninstall scripts into `<build>/package/<dir>/`, zips that
//! directory into `<build>/s3/<dir>.zip`, records the zip and its checksum in
//! the manifest, and finally writes `<build>/s3/manifest.json`. The `s3`
//! directory is exactly what gets uploaded.

use crate::archive::{sha256_file, zip_package};
use crate::distro::DistroTable;
use crate::error::Result;
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::script::{write_package_script, ScriptSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default publisher written to the manifest
pub const DEFAULT_PUBLISHER: &str = "Crowdstrike Inc.";

/// Default manifest description
pub const DEFAULT_DESCRIPTION: &str = "The CrowdStrike Falcon cloud platform helps successfully stop breaches, all via a single lightweight agent. Learn how to protect your AWS environment with CrowdStrike at https://github.com/CrowdStrike/aws-ssm-distributor/tree/main/custom-api-package";

/// One built zip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Directory / zip base name
    pub distro_dir: String,
    /// Path to the zip
    pub zip_path: PathBuf,
    /// Zip checksum
    pub sha256: String,
}

/// Result of a build
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Directory holding the zips and manifest
    pub s3_dir: PathBuf,
    /// Manifest written to `s3_dir`
    pub manifest: Manifest,
    /// Built zips, in table order
    pub artifacts: Vec<Artifact>,
}

impl BuildOutput {
    /// Path of the written manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.s3_dir.join(MANIFEST_FILE)
    }
}

/// Builds every distro package and the manifest
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    table: DistroTable,
    scripts: ScriptSet,
    build_dir: PathBuf,
    version: String,
    publisher: String,
    description: String,
    clean: bool,
}

impl PackageBuilder {
    /// Create a builder writing under `build_dir`
    pub fn new(table: DistroTable, scripts: ScriptSet, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            table,
            scripts,
            build_dir: build_dir.into(),
            version: "v1.0.0".to_string(),
            publisher: DEFAULT_PUBLISHER.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            clean: true,
        }
    }

    /// Set the package version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the manifest publisher
    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    /// Set the manifest description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Remove output from a previous build before building (default: true)
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Root build directory
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Directory holding rendered scripts
    pub fn package_root(&self) -> PathBuf {
        self.build_dir.join("package")
    }

    /// Directory holding zips and the manifest
    pub fn s3_dir(&self) -> PathBuf {
        self.build_dir.join("s3")
    }

    /// Build every package and write the manifest
    pub fn build(&self) -> Result<BuildOutput> {
        self.table.validate()?;
        info!(
            "Creating distributor package version: {} ({} distros)",
            self.version,
            self.table.len()
        );

        let package_root = self.package_root();
        let s3_dir = self.s3_dir();

        if self.clean {
            for dir in [&package_root, &s3_dir] {
                if dir.exists() {
                    fs::remove_dir_all(dir)?;
                }
            }
        }
        fs::create_dir_all(&s3_dir)?;

        let mut manifest = Manifest::new(&self.version, &self.publisher, &self.description);
        let mut artifacts = Vec::with_capacity(self.table.len());

        for (platform, distro) in self.table.iter() {
            info!(
                "Creating package for {} {} {}",
                distro.name, distro.version, distro.arch
            );

            let distro_dir = distro.package_dir_name();
            let package_dir = package_root.join(&distro_dir);
            let ext = platform.script_extension();
            let scripts = self.scripts.for_platform(platform);

            write_package_script(
                &scripts.install,
                &package_dir.join(format!("install{}", ext)),
                distro,
            )?;
            write_package_script(
                &scripts.uninstall,
                &package_dir.join(format!("uninstall{}", ext)),
                distro,
            )?;

            let zip_name = format!("{}.zip", distro_dir);
            let zip_path = s3_dir.join(&zip_name);
            zip_package(&package_dir, &zip_path)?;
            let sha256 = sha256_file(&zip_path)?;

            manifest.add_package(distro, &zip_name, &sha256);
            artifacts.push(Artifact {
                distro_dir,
                zip_path,
                sha256,
            });
        }

        manifest.write(&s3_dir.join(MANIFEST_FILE))?;
        info!(
            "Wrote {} packages and manifest to {}",
            artifacts.len(),
            s3_dir.display()
        );

        Ok(BuildOutput {
            s3_dir,
            manifest,
            artifacts,
        })
    }
}
