//! Distros command - show the distro table

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;

/// Arguments for the distros command
#[derive(Parser, Debug, Clone)]
pub struct DistrosArgs {
    /// Distro table (defaults to ./distros.json, then the builtin table)
    #[arg(long)]
    pub distros: Option<PathBuf>,
}

impl DistrosArgs {
    /// Execute the distros command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let table = ctx.distro_table(self.distros.as_ref())?;
        table.validate()?;

        if ctx.output.is_json() {
            let entries: Vec<_> = table
                .iter()
                .map(|(platform, d)| {
                    json!({
                        "platform": platform.as_str(),
                        "name": d.name,
                        "version": d.version,
                        "arch": d.arch,
                        "package_manager": d.package_manager,
                        "package": d.package_dir_name(),
                    })
                })
                .collect();
            ctx.output.result("", &entries);
            return Ok(0);
        }

        let rows: Vec<Vec<String>> = table
            .iter()
            .map(|(platform, d)| {
                vec![
                    platform.to_string(),
                    d.name.clone(),
                    d.version.clone(),
                    d.arch.clone(),
                    d.package_manager.clone(),
                    d.package_dir_name(),
                ]
            })
            .collect();

        ctx.output
            .table(&["platform", "name", "version", "arch", "manager", "package"], &rows);
        println!("\n{} distros", table.len());
        Ok(0)
    }
}
