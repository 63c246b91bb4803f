//! ssm-distributor - SSM Distributor package builder and publisher
//!
//! This is the main entry point for the ssm-distributor CLI.

mod cli;

use anyhow::Result;
use cli::commands::CommandContext;
use cli::{Cli, Commands};
use ssm_distributor::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        Config::default()
    });

    init_logging(cli.verbosity(), &config, cli.is_lambda());

    if cli.verbosity() >= 2 {
        eprintln!("ssm-distributor v{}", VERSION);
    }

    let mut ctx = CommandContext::new(&cli, config);

    let exit_code = match run(&cli, &mut ctx).await {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&format!("{:#}", e));
            e.downcast_ref::<ssm_distributor::Error>()
                .map(ssm_distributor::Error::exit_code)
                .unwrap_or(1)
        }
    };

    ctx.output.flush();
    std::process::exit(exit_code);
}

/// Execute the selected subcommand
async fn run(cli: &Cli, ctx: &mut CommandContext) -> Result<i32> {
    match &cli.command {
        Commands::Build(args) => args.execute(ctx).await,
        #[cfg(feature = "aws")]
        Commands::Publish(args) => args.execute(ctx).await,
        #[cfg(feature = "aws")]
        Commands::PutParameters(args) => args.execute(ctx).await,
        Commands::Distros(args) => args.execute(ctx).await,
        #[cfg(feature = "lambda")]
        Commands::Lambda(args) => args.execute(ctx).await,
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8, config: &Config, lambda: bool) {
    let filter = match verbosity {
        0 => config.logging.level.as_deref().unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // The Lambda runtime defaults to info; CloudWatch supplies timestamps.
    let filter = if lambda && verbosity == 0 && config.logging.level.is_none() {
        "info"
    } else {
        filter
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if lambda {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(false).without_time())
            .with(env_filter)
            .init();
    } else if config.logging.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(verbosity >= 3))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(verbosity >= 3).with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    }
}
