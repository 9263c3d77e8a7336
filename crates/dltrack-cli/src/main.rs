//! CLI entry point - the composition root.
//!
//! Settings are resolved once, then each command gets a context from
//! `bootstrap`.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use dltrack_cli::handlers::{file_info, simulate, version};
use dltrack_cli::{Cli, CliConfig, CliError, Commands, bootstrap};
use dltrack_download::SimulationConfig;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::from_cli(&cli)?;

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Simulate(args) => {
            let ctx = bootstrap(&config, simulate::simulation_config(&args))?;
            simulate::execute(&ctx, &args).await?;
            ctx.tracker.shutdown().await;
        }
        Commands::FileInfo { path } => {
            let ctx = bootstrap(&config, SimulationConfig::default())?;
            file_info::execute(&ctx, &path).await?;
        }
        Commands::Version => {
            version::execute()?;
        }
    }

    Ok(())
}
