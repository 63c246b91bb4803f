//! Distro table - the set of operating systems a package is built for.
//!
//! The table is the `distros.json` format: a map from platform to a list of
//! distro entries, each carrying the vendor sensor-download filter and the
//! package manager the install script should use.
//!
//! ```json
//! {
//!     "linux": [
//!         {
//!             "name": "amazon",
//!             "version": "2023",
//!             "arch": "arm64",
//!             "package_manager": "yum",
//!             "filter": "os:'Amazon Linux'+os_version:'2023 - arm64'+platform:'linux'"
//!         }
//!     ],
//!     "windows": [
//!         { "name": "windows", "version": "_any", "arch": "_any",
//!           "package_manager": "", "filter": "os:'Windows'+platform:'windows'" }
//!     ]
//! }
//! ```

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Distro table compiled into the binary, used by the custom resource handler.
const BUILTIN_DISTROS: &str = include_str!("../distros.json");

/// Target platform of a distro entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    /// Linux hosts, bash scripts
    Linux,
    /// Windows hosts, PowerShell scripts
    Windows,
}

impl Platform {
    /// Parse a platform key from the distro table
    pub fn from_key(key: &str) -> Result<Self> {
        match key.to_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "windows" => Ok(Platform::Windows),
            other => Err(Error::InvalidDistroTable(format!(
                "unknown platform '{}'. Valid platforms: linux, windows",
                other
            ))),
        }
    }

    /// Key used in the distro table
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "windows",
        }
    }

    /// Extension of the install/uninstall scripts for this platform
    pub fn script_extension(&self) -> &'static str {
        match self {
            Platform::Linux => ".sh",
            Platform::Windows => ".ps1",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single distro/version/arch combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distro {
    /// Optional explicit identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Distro name as SSM reports it (amazon, redhat, ubuntu, ...)
    pub name: String,
    /// Version pattern (`2023`, `8.*`, `_any`)
    pub version: String,
    /// Optional minor version pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_version: Option<String>,
    /// Architecture (`x86_64`, `arm64`, `_any`)
    pub arch: String,
    /// Package manager used by the install script (yum, dpkg, zypper)
    #[serde(default)]
    pub package_manager: String,
    /// Sensor download filter
    pub filter: String,
}

impl Distro {
    /// Directory and zip base name for this distro.
    ///
    /// The version's wildcard suffix and the `_any` marker are dropped, so
    /// `redhat` / `8.*` / `arm64` becomes `redhat8-arm64`.
    pub fn package_dir_name(&self) -> String {
        let version = self.version.replace(".*", "").replace("_any", "");
        format!("{}{}-{}", self.name, version, self.arch)
    }

    fn key(&self) -> (&str, &str, &str) {
        (&self.name, &self.version, &self.arch)
    }
}

/// Ordered table of distros per platform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistroTable {
    platforms: IndexMap<Platform, Vec<Distro>>,
}

impl DistroTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The table compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_DISTROS)
    }

    /// Load a table from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let table = Self::from_json(&content).map_err(|e| match e {
            Error::JsonParse(inner) => Error::distro_table_parse(path, inner.to_string()),
            other => other,
        })?;

        tracing::debug!(
            "Loaded {} distros from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse a table from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: IndexMap<String, Vec<Distro>> = serde_json::from_str(content)?;

        let mut table = Self::new();
        for (key, distros) in raw {
            let platform = Platform::from_key(&key)?;
            table.platforms.entry(platform).or_default().extend(distros);
        }

        table.validate()?;
        Ok(table)
    }

    /// Serialize the table back to the `distros.json` shape
    pub fn to_json(&self) -> Result<String> {
        let raw: IndexMap<&str, &Vec<Distro>> = self
            .platforms
            .iter()
            .map(|(platform, distros)| (platform.as_str(), distros))
            .collect();
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    /// Append a distro under a platform
    pub fn push(&mut self, platform: Platform, distro: Distro) {
        self.platforms.entry(platform).or_default().push(distro);
    }

    /// Check that the table is usable for a build
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidDistroTable(
                "expected distros.json to contain distro information".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (platform, distro) in self.iter() {
            if !seen.insert(distro.key()) {
                return Err(Error::InvalidDistroTable(format!(
                    "duplicate {} entry: {} {} {}",
                    platform, distro.name, distro.version, distro.arch
                )));
            }
            if platform == Platform::Linux && distro.package_manager.is_empty() {
                return Err(Error::InvalidDistroTable(format!(
                    "linux entry {} {} {} has no package_manager",
                    distro.name, distro.version, distro.arch
                )));
            }
        }

        Ok(())
    }

    /// Iterate over `(platform, distro)` pairs in table order
    pub fn iter(&self) -> impl Iterator<Item = (Platform, &Distro)> {
        self.platforms
            .iter()
            .flat_map(|(platform, distros)| distros.iter().map(move |d| (*platform, d)))
    }

    /// Distros for a single platform
    pub fn platform(&self, platform: Platform) -> &[Distro] {
        self.platforms
            .get(&platform)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Platforms present in the table
    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.platforms.keys().copied()
    }

    /// Total number of distros
    pub fn len(&self) -> usize {
        self.platforms.values().map(Vec::len).sum()
    }

    /// True if no distros are defined
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distro(name: &str, version: &str, arch: &str) -> Distro {
        Distro {
            id: None,
            name: name.to_string(),
            version: version.to_string(),
            minor_version: None,
            arch: arch.to_string(),
            package_manager: "yum".to_string(),
            filter: format!("os:'{}'", name),
        }
    }

    #[test]
    fn test_package_dir_name() {
        assert_eq!(distro("redhat", "8.*", "arm64").package_dir_name(), "redhat8-arm64");
        assert_eq!(distro("amazon", "2023", "x86_64").package_dir_name(), "amazon2023-x86_64");
        assert_eq!(distro("windows", "_any", "_any").package_dir_name(), "windows-_any");
    }

    #[test]
    fn test_platform_from_key() {
        assert_eq!(Platform::from_key("linux").unwrap(), Platform::Linux);
        assert_eq!(Platform::from_key("Windows").unwrap(), Platform::Windows);
        assert!(Platform::from_key("macos").is_err());
        assert_eq!(Platform::Windows.script_extension(), ".ps1");
    }

    #[test]
    fn test_builtin_table() {
        let table = DistroTable::builtin().unwrap();
        assert_eq!(table.len(), 40);
        assert_eq!(table.platform(Platform::Windows).len(), 1);

        let (platform, first) = table.iter().next().unwrap();
        assert_eq!(platform, Platform::Linux);
        assert_eq!(first.package_dir_name(), "amazon2-x86_64");
    }

    #[test]
    fn test_empty_table_rejected() {
        let err = DistroTable::from_json("{}").unwrap_err();
        assert!(err.to_string().contains("expected distros.json"));

        let err = DistroTable::from_json(r#"{"linux": []}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidDistroTable(_)));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut table = DistroTable::new();
        table.push(Platform::Linux, distro("ubuntu", "22.*", "arm64"));
        table.push(Platform::Linux, distro("ubuntu", "22.*", "arm64"));
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_optional_fields_roundtrip_through_table() {
        let json = r#"{
            "linux": [
                {"id": "ubuntu22", "name": "ubuntu", "version": "22.*", "minor_version": "*",
                 "arch": "arm64", "package_manager": "dpkg", "filter": "f"}
            ]
        }"#;
        let table = DistroTable::from_json(json).unwrap();
        let (_, d) = table.iter().next().unwrap();
        assert_eq!(d.id.as_deref(), Some("ubuntu22"));
        assert_eq!(d.minor_version.as_deref(), Some("*"));

        let again = DistroTable::from_json(&table.to_json().unwrap()).unwrap();
        assert_eq!(again, table);
    }
}
