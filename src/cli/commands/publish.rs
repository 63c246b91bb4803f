//! Publish command - upload the package and create it in every region

use super::CommandContext;
use anyhow::{anyhow, Result};
use aws_config::BehaviorVersion;
use clap::Parser;
use serde_json::json;
use ssm_distributor::deploy::{DeployRequest, Deployer};
use ssm_distributor::regions::{AccountRegions, RegionSource, StaticRegions};
use ssm_distributor::ssm::SsmDocumentsFactory;
use ssm_distributor::storage::S3Store;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the publish command
#[derive(Parser, Debug, Clone)]
pub struct PublishArgs {
    /// S3 bucket receiving the package files
    #[arg(long, env = "DISTRIBUTOR_BUCKET")]
    pub bucket: Option<String>,

    /// Distributor package name
    #[arg(long)]
    pub name: Option<String>,

    /// Package version name
    #[arg(long = "version", value_name = "VERSION")]
    pub package_version: Option<String>,

    /// Target region (repeatable); all enabled regions when omitted
    #[arg(long = "region", value_name = "REGION")]
    pub regions: Vec<String>,

    /// Return once documents are created instead of waiting for them to
    /// become active
    #[arg(long)]
    pub no_wait: bool,

    /// Distro table (defaults to ./distros.json, then the builtin table)
    #[arg(long)]
    pub distros: Option<PathBuf>,

    /// Directory holding linux/ and windows/ script templates
    #[arg(long)]
    pub scripts: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    pub build_dir: Option<PathBuf>,
}

impl PublishArgs {
    /// Execute the publish command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        ctx.output.banner("SSM DISTRIBUTOR PUBLISH");

        let bucket = self
            .bucket
            .clone()
            .or_else(|| ctx.config.aws.bucket.clone())
            .ok_or_else(|| anyhow!("No bucket given: pass --bucket or set DISTRIBUTOR_BUCKET"))?;
        let name = self.name.clone().unwrap_or_else(|| ctx.config.package.name.clone());
        let version = self
            .package_version
            .clone()
            .unwrap_or_else(|| ctx.config.package.version.clone());

        let request = DeployRequest::new(bucket)
            .package_name(name)
            .package_version(version.clone());

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &ctx.config.aws.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let target_regions = if self.regions.is_empty() {
            ctx.config.aws.regions.clone()
        } else {
            self.regions.clone()
        };
        let regions: Arc<dyn RegionSource> = if target_regions.is_empty() {
            Arc::new(AccountRegions::new(&sdk_config))
        } else {
            Arc::new(StaticRegions::new(target_regions))
        };

        let table = ctx.distro_table(self.distros.as_ref())?;
        let scripts = ctx.scripts(self.scripts.as_ref())?;
        let builder = ctx.package_builder(table, scripts, self.build_dir.as_deref(), &version);

        let deployer = Deployer::new(
            regions,
            Arc::new(SsmDocumentsFactory::new(sdk_config.clone())),
            Arc::new(S3Store::new(aws_sdk_s3::Client::new(&sdk_config))),
            builder,
        )
        .poll_interval(ctx.config.aws.poll_interval)
        .max_wait(ctx.config.aws.max_wait)
        .wait(!self.no_wait);

        let spinner = ctx.output.create_spinner(&format!(
            "Publishing {} {} to s3://{}",
            request.package_name, request.package_version, request.bucket
        ));
        let result = deployer.run(&request).await;
        if let Some(sp) = spinner {
            sp.finish_and_clear();
        }
        let report = result?;

        ctx.output.section("REGIONS");
        for region in &report.existing {
            ctx.output.status(region, "exists", true);
        }
        for region in &report.created {
            let state = if self.no_wait { "created" } else { "active" };
            ctx.output.status(region, state, true);
        }

        ctx.output.result(
            &report.message(&request),
            &json!({
                "package": request.package_name,
                "version": request.package_version,
                "source_url": request.source_url(),
                "regions": report.regions,
                "existing": report.existing,
                "created": report.created,
                "uploaded": report.uploaded,
            }),
        );

        Ok(0)
    }
}
