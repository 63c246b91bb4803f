//! Put-parameters command - store sensor API credentials

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use ssm_distributor::parameters::{put_parameters, ParameterSet, SsmParameters};

/// Arguments for the put-parameters command.
///
/// Values and parameter names are read from `falcon_client_id`,
/// `falcon_secret`, `falcon_cloud`, `falcon_client_id_name`,
/// `falcon_secret_name` and `falcon_cloud_name`.
#[derive(Parser, Debug, Clone)]
pub struct PutParametersArgs {}

impl PutParametersArgs {
    /// Execute the put-parameters command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let set = ParameterSet::from_env()?;
        let store = SsmParameters::from_env().await;

        let names = put_parameters(&store, &set).await?;
        for name in &names {
            ctx.output.status(name, "stored", true);
        }
        ctx.output
            .result(&format!("Stored {} parameters", names.len()), &serde_json::json!({ "parameters": names }));
        Ok(0)
    }
}
