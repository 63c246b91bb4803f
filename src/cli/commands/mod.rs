//! Subcommands module for the ssm-distributor CLI
//!
//! This module contains all the subcommand implementations.

pub mod build;
pub mod distros;
#[cfg(feature = "lambda")]
pub mod lambda;
#[cfg(feature = "aws")]
pub mod parameters;
#[cfg(feature = "aws")]
pub mod publish;

use anyhow::{Context, Result};
use ssm_distributor::builder::PackageBuilder;
use ssm_distributor::config::Config;
use ssm_distributor::distro::DistroTable;
use ssm_distributor::output::OutputFormatter;
use ssm_distributor::script::ScriptSet;
use std::path::{Path, PathBuf};

/// Distro table looked up in the working directory
pub const DEFAULT_DISTROS_FILE: &str = "distros.json";

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.logging.color;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());

        Self { config, output }
    }

    /// Load the distro table: an explicit path, then the configured path,
    /// then `./distros.json`, then the builtin table.
    pub fn distro_table(&self, explicit: Option<&PathBuf>) -> Result<DistroTable> {
        let path = explicit
            .cloned()
            .or_else(|| self.config.build.distros.clone())
            .or_else(|| {
                let local = PathBuf::from(DEFAULT_DISTROS_FILE);
                local.exists().then_some(local)
            });

        match path {
            Some(path) => {
                tracing::info!("Loading distro table from {}", path.display());
                Ok(DistroTable::from_file(&path)?)
            }
            None => {
                tracing::info!("Using the builtin distro table");
                Ok(DistroTable::builtin()?)
            }
        }
    }

    /// Load script templates from a directory or use the builtin ones
    pub fn scripts(&self, explicit: Option<&PathBuf>) -> Result<ScriptSet> {
        match explicit.or(self.config.build.scripts.as_ref()) {
            Some(dir) => ScriptSet::from_dir(dir)
                .with_context(|| format!("Failed to load scripts from {}", dir.display())),
            None => Ok(ScriptSet::builtin()),
        }
    }

    /// Package builder configured from settings and overrides
    pub fn package_builder(
        &self,
        table: DistroTable,
        scripts: ScriptSet,
        build_dir: Option<&Path>,
        version: &str,
    ) -> PackageBuilder {
        let build_dir = build_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.build.build_dir.clone());

        PackageBuilder::new(table, scripts, build_dir)
            .version(version)
            .publisher(&self.config.package.publisher)
            .description(&self.config.package.description)
    }
}
