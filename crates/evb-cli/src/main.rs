mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("🚀 EVB toolkit v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let progress = if cli.quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };

    let command_result = match cli.command {
        Commands::Build(args) => {
            info!("Dispatching to 'build' command.");
            commands::build::run(args, &progress)
        }
        Commands::Map(args) => {
            info!("Dispatching to 'map' command.");
            commands::map::run(args, &progress)
        }
        Commands::Stats(args) => {
            info!("Dispatching to 'stats' command.");
            commands::stats::run(args, &progress)
        }
        Commands::Fit(args) => {
            info!("Dispatching to 'fit' command.");
            commands::fit::run(args, &progress)
        }
        Commands::Qfep(args) => {
            info!("Dispatching to 'qfep' command.");
            commands::qfep::run(args, &progress)
        }
        Commands::Molaris(args) => {
            info!("Dispatching to 'molaris' command.");
            commands::molaris::run(args, &progress)
        }
        Commands::MolarisStats(args) => {
            info!("Dispatching to 'molaris-stats' command.");
            commands::molaris_stats::run(args, &progress)
        }
    };

    match &command_result {
        Ok(_) => {
            info!("✅ Command completed successfully.");
            if !cli.quiet {
                println!("✅ Command completed successfully.");
            }
        }
        Err(e) => error!("❌ Command failed: {}", e),
    }

    command_result
}
