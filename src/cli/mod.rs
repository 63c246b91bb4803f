//! CLI module for ssm-distributor
//!
//! Argument parsing and subcommand dispatch.

pub mod commands;

use clap::{Parser, Subcommand};
use ssm_distributor::output::OutputMode;
use std::path::PathBuf;

/// Build and publish AWS Systems Manager Distributor packages
#[derive(Parser, Debug, Clone)]
#[command(name = "ssm-distributor")]
#[command(author = "SSM Distributor Contributors")]
#[command(version)]
#[command(about = "Build and publish SSM Distributor packages for an endpoint sensor", long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub output: OutputMode,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "DISTRIBUTOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render scripts, zip every distro package and write the manifest
    Build(commands::build::BuildArgs),

    /// Publish the package to S3 and create it in every enabled region
    #[cfg(feature = "aws")]
    Publish(commands::publish::PublishArgs),

    /// Store the sensor API credentials as SSM parameters
    #[cfg(feature = "aws")]
    #[command(name = "put-parameters")]
    PutParameters(commands::parameters::PutParametersArgs),

    /// List the distro table
    Distros(commands::distros::DistrosArgs),

    /// Serve the CloudFormation custom resource on the Lambda runtime
    #[cfg(feature = "lambda")]
    Lambda(commands::lambda::LambdaArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        self.output == OutputMode::Json
    }

    /// Whether this invocation runs inside the Lambda runtime
    pub fn is_lambda(&self) -> bool {
        #[cfg(feature = "lambda")]
        if matches!(self.command, Commands::Lambda(_)) {
            return true;
        }
        false
    }
}
