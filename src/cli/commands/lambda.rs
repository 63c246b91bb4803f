//! Lambda command - serve a custom resource handler

use super::CommandContext;
use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use ssm_distributor::custom_resource::{run_lambda, run_parameters_lambda};
use ssm_distributor::deploy::Deployer;
use ssm_distributor::parameters::{ParameterSet, SsmParameters};
use ssm_distributor::regions::AccountRegions;
use ssm_distributor::ssm::SsmDocumentsFactory;
use ssm_distributor::storage::S3Store;
use std::path::PathBuf;
use std::sync::Arc;

/// Custom resource served by the function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Handler {
    /// Publish the distributor package to every enabled region
    #[default]
    Deploy,
    /// Store the sensor API credentials as SSM parameters
    Parameters,
}

/// Arguments for the lambda command
#[derive(Parser, Debug, Clone)]
pub struct LambdaArgs {
    /// Handler to serve
    #[arg(long, value_enum, default_value = "deploy", env = "DISTRIBUTOR_HANDLER")]
    pub handler: Handler,
}

impl LambdaArgs {
    /// Execute the lambda command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        match self.handler {
            Handler::Deploy => {
                let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

                // Only /tmp is writable inside the function.
                let build_dir = if ctx.config.build.build_dir == PathBuf::from("./builds") {
                    std::env::temp_dir().join("builds")
                } else {
                    ctx.config.build.build_dir.clone()
                };

                let table = ctx.distro_table(None)?;
                let scripts = ctx.scripts(None)?;
                let builder = ctx.package_builder(table, scripts, Some(build_dir.as_path()), &ctx.config.package.version);

                let deployer = Deployer::new(
                    Arc::new(AccountRegions::new(&sdk_config)),
                    Arc::new(SsmDocumentsFactory::new(sdk_config.clone())),
                    Arc::new(S3Store::new(aws_sdk_s3::Client::new(&sdk_config))),
                    builder,
                )
                .poll_interval(ctx.config.aws.poll_interval)
                .max_wait(ctx.config.aws.max_wait);

                run_lambda(deployer).await.map_err(|e| anyhow!(e))?;
            }
            Handler::Parameters => {
                let parameters = ParameterSet::from_env()?;
                let store = SsmParameters::from_env().await;
                run_parameters_lambda(&store, parameters)
                    .await
                    .map_err(|e| anyhow!(e))?;
            }
        }

        Ok(0)
    }
}
