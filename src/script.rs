//! Install/uninstall script templating.
//!
//! Scripts are plain text with two placeholders that are substituted per
//! distro before packaging:
//!
//! - `<<SENSOR_DOWNLOAD_FILTER>>`: the distro's sensor download filter
//! - `<<PACKAGE_MANAGER>>`: the distro's package manager (yum, dpkg, zypper)

use crate::distro::{Distro, Platform};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Placeholder replaced by the distro's download filter
pub const FILTER_KEYWORD: &str = "<<SENSOR_DOWNLOAD_FILTER>>";

/// Placeholder replaced by the distro's package manager
pub const PACKAGE_MANAGER_KEYWORD: &str = "<<PACKAGE_MANAGER>>";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"<<[A-Z][A-Z0-9_]*>>").unwrap());

const LINUX_INSTALL: &str = include_str!("../scripts/linux/install.sh");
const LINUX_UNINSTALL: &str = include_str!("../scripts/linux/uninstall.sh");
const WINDOWS_INSTALL: &str = include_str!("../scripts/windows/install.ps1");
const WINDOWS_UNINSTALL: &str = include_str!("../scripts/windows/uninstall.ps1");

/// A script with unrendered placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTemplate {
    name: String,
    source: String,
}

impl ScriptTemplate {
    /// Create a template from its source text
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Read a template from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::ScriptNotFound(path.to_path_buf()));
        }
        let source = fs::read_to_string(path)?;
        Ok(Self::new(path.display().to_string(), source))
    }

    /// Template name, used in log messages
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Substitute the filter and package manager, line by line.
    pub fn render(&self, filter: &str, package_manager: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + filter.len());
        for line in self.source.split_inclusive('\n') {
            out.push_str(
                &line
                    .replace(FILTER_KEYWORD, filter)
                    .replace(PACKAGE_MANAGER_KEYWORD, package_manager),
            );
        }

        if let Some(leftover) = PLACEHOLDER.find(&out) {
            tracing::warn!(
                "Script '{}' still contains placeholder {} after rendering",
                self.name,
                leftover.as_str()
            );
        }

        out
    }

    /// Render for a specific distro
    pub fn render_for(&self, distro: &Distro) -> String {
        self.render(&distro.filter, &distro.package_manager)
    }
}

/// Install and uninstall templates for one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPair {
    /// Install script template
    pub install: ScriptTemplate,
    /// Uninstall script template
    pub uninstall: ScriptTemplate,
}

/// Script templates for every platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSet {
    linux: ScriptPair,
    windows: ScriptPair,
}

impl ScriptSet {
    /// Reference scripts compiled into the binary
    pub fn builtin() -> Self {
        Self {
            linux: ScriptPair {
                install: ScriptTemplate::new("linux/install.sh", LINUX_INSTALL),
                uninstall: ScriptTemplate::new("linux/uninstall.sh", LINUX_UNINSTALL),
            },
            windows: ScriptPair {
                install: ScriptTemplate::new("windows/install.ps1", WINDOWS_INSTALL),
                uninstall: ScriptTemplate::new("windows/uninstall.ps1", WINDOWS_UNINSTALL),
            },
        }
    }

    /// Load scripts from a directory laid out as
    /// `linux/install.sh`, `linux/uninstall.sh`, `windows/install.ps1`,
    /// `windows/uninstall.ps1`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            linux: ScriptPair {
                install: ScriptTemplate::from_file(dir.join("linux/install.sh"))?,
                uninstall: ScriptTemplate::from_file(dir.join("linux/uninstall.sh"))?,
            },
            windows: ScriptPair {
                install: ScriptTemplate::from_file(dir.join("windows/install.ps1"))?,
                uninstall: ScriptTemplate::from_file(dir.join("windows/uninstall.ps1"))?,
            },
        })
    }

    /// Scripts for a platform
    pub fn for_platform(&self, platform: Platform) -> &ScriptPair {
        match platform {
            Platform::Linux => &self.linux,
            Platform::Windows => &self.windows,
        }
    }
}

/// Render `template` for `distro` and write it to `dest`, creating parent
/// directories as needed.
pub fn write_package_script(template: &ScriptTemplate, dest: &Path, distro: &Distro) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(dest, template.render_for(distro))?;
    tracing::debug!("Wrote {} from {}", dest.display(), template.name());
    Ok(())
}
