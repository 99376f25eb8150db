use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use calrep_cli::commands::{fetch, report, status};
use calrep_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Some(Commands::Report {
            period,
            json,
            refresh,
        }) => report::run(&mut stdout, &config, period, *json, *refresh)?,
        Some(Commands::Fetch { period }) => fetch::run(&mut stdout, &config, period)?,
        Some(Commands::Status) => status::run(&mut stdout, &config)?,
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
