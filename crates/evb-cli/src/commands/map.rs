use crate::cli::MapArgs;
use crate::config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use evbkit::core::estimator::ProfileReport;
use evbkit::engine::progress::ProgressReporter;
use evbkit::workflows::{self, map::EnergyFiles};
use tracing::info;

/// Explicit file lists when given, otherwise the energy files found under `--path`.
fn energy_files(args: &MapArgs) -> Result<EnergyFiles> {
    if args.reactant.is_empty() {
        info!("Searching {:?} for energy files...", &args.path);
        Ok(EnergyFiles::discover(&args.path)?)
    } else {
        Ok(EnergyFiles {
            reactant: args.reactant.clone(),
            product: args.product.clone(),
            reference: args.reference.clone(),
        })
    }
}

fn format_outcome(report: &ProfileReport) -> String {
    match (report.barrier(), report.reaction_free_energy()) {
        (Some(barrier), Some(reaction)) => format!("TS: {:>7.2}, dG0: {:>7.2}", barrier, reaction),
        _ => report
            .stationary
            .warnings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn run(args: MapArgs, progress: &CliProgressHandler) -> Result<()> {
    let config = config::mapping_config(&args)?;
    let files = energy_files(&args)?;

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let result = workflows::map::run(&files, &config, Some(args.output.as_path()), &reporter)?;

    if !result.warnings.is_empty() {
        info!(count = result.warnings.len(), "Mapping finished with warnings.");
    }
    println!("{}", format_outcome(&result.report));
    if let Some(path) = &result.output {
        println!("Profile written to: {}", path.display());
    }
    Ok(())
}
