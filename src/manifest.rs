//! SSM Distributor package manifest.
//!
//! The manifest is the content of the `Package` document SSM creates. Its
//! shape is fixed by the Distributor schema version 2.0:
//!
//! ```json
//! {
//!     "schemaVersion": "2.0",
//!     "publisher": "...",
//!     "description": "...",
//!     "version": "v1.0.0",
//!     "packages": {
//!         "amazon": { "2023": { "arm64": { "file": "amazon2023-arm64.zip" } } }
//!     },
//!     "files": {
//!         "amazon2023-arm64.zip": { "checksums": { "sha256": "..." } }
//!     }
//! }
//! ```

use crate::distro::Distro;
use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Distributor manifest schema version
pub const SCHEMA_VERSION: &str = "2.0";

/// File name of the manifest in the upload directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Reference to the zip for one name/version/arch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFile {
    /// Zip file name
    pub file: String,
}

/// Checksums of a package file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksums {
    /// Lowercase hex SHA-256
    pub sha256: String,
}

/// Entry in the `files` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File checksums
    pub checksums: Checksums,
}

/// `name -> version -> arch -> file`
pub type PackageTree = IndexMap<String, IndexMap<String, IndexMap<String, PackageFile>>>;

/// Distributor package manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Always `2.0`
    pub schema_version: String,
    /// Package publisher
    pub publisher: String,
    /// Package description
    pub description: String,
    /// Package version name
    pub version: String,
    /// Per-platform package files
    pub packages: PackageTree,
    /// Checksums by file name
    pub files: IndexMap<String, FileEntry>,
}

impl Manifest {
    /// Create an empty manifest
    pub fn new(
        version: impl Into<String>,
        publisher: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            publisher: publisher.into(),
            description: description.into(),
            version: version.into(),
            packages: IndexMap::new(),
            files: IndexMap::new(),
        }
    }

    /// Register the zip built for `distro`. A second zip for the same
    /// name/version/arch replaces the first.
    pub fn add_package(&mut self, distro: &Distro, file_name: &str, sha256: &str) {
        self.packages
            .entry(distro.name.clone())
            .or_default()
            .entry(distro.version.clone())
            .or_default()
            .insert(
                distro.arch.clone(),
                PackageFile {
                    file: file_name.to_string(),
                },
            );

        self.files.insert(
            file_name.to_string(),
            FileEntry {
                checksums: Checksums {
                    sha256: sha256.to_string(),
                },
            },
        );
    }

    /// Zip file registered for a name/version/arch
    pub fn file_for(&self, name: &str, version: &str, arch: &str) -> Option<&str> {
        self.packages
            .get(name)?
            .get(version)?
            .get(arch)
            .map(|p| p.file.as_str())
    }

    /// Number of package files
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Pretty JSON with four-space indentation
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Compact JSON used as SSM document content
    pub fn to_document_content(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the manifest to `path`
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_pretty_json()?)?;
        tracing::debug!("Wrote manifest with {} files to {}", self.file_count(), path.display());
        Ok(())
    }

    /// Read a manifest written by [`Manifest::write`]
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
