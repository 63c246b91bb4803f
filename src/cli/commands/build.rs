//! Build command - package every distro locally

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;

/// Arguments for the build command
#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    /// Package version written to the manifest (e.g. v1.0.0)
    #[arg(long = "version", value_name = "VERSION")]
    pub package_version: Option<String>,

    /// Distro table (defaults to ./distros.json, then the builtin table)
    #[arg(long)]
    pub distros: Option<PathBuf>,

    /// Directory holding linux/ and windows/ script templates
    #[arg(long)]
    pub scripts: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Manifest publisher
    #[arg(long)]
    pub publisher: Option<String>,

    /// Keep output from previous builds
    #[arg(long)]
    pub no_clean: bool,
}

impl BuildArgs {
    /// Execute the build command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        ctx.output.banner("SSM DISTRIBUTOR BUILD");

        let version = self
            .package_version
            .clone()
            .unwrap_or_else(|| ctx.config.package.version.clone());
        let table = ctx.distro_table(self.distros.as_ref())?;
        let scripts = ctx.scripts(self.scripts.as_ref())?;

        let mut builder = ctx
            .package_builder(table, scripts, self.build_dir.as_deref(), &version)
            .clean(!self.no_clean);
        if let Some(publisher) = &self.publisher {
            builder = builder.publisher(publisher);
        }

        ctx.output.info(&format!(
            "Building version {} into {}",
            version,
            builder.build_dir().display()
        ));

        let output = tokio::task::spawn_blocking(move || builder.build()).await??;

        ctx.output.section("PACKAGES");
        let rows: Vec<Vec<String>> = output
            .artifacts
            .iter()
            .map(|a| vec![a.distro_dir.clone(), a.sha256.clone()])
            .collect();
        if !ctx.output.is_json() {
            ctx.output.table(&["package", "sha256"], &rows);
        }

        ctx.output.result(
            &format!(
                "Built {} packages and {}",
                output.artifacts.len(),
                output.manifest_path().display()
            ),
            &json!({
                "version": version,
                "s3_dir": output.s3_dir,
                "manifest": output.manifest_path(),
                "packages": output
                    .artifacts
                    .iter()
                    .map(|a| json!({"name": a.distro_dir, "zip": a.zip_path, "sha256": a.sha256}))
                    .collect::<Vec<_>>(),
            }),
        );

        Ok(0)
    }
}
