use crate::cli::BuildArgs;
use crate::config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use evbkit::{engine::progress::ProgressReporter, workflows};
use tracing::info;

pub fn run(args: BuildArgs, progress: &CliProgressHandler) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = config::build_config(&args)?;

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    println!(
        "Building {} window topologies in {}...",
        config.window_count,
        config.output_dir.display()
    );
    let result = workflows::build::run(&config, &reporter)?;

    let summary = &result.summary;
    info!(
        bonds = summary.bonds,
        angles = summary.angles,
        torsions = summary.torsions,
        impropers = summary.impropers,
        soft_core = summary.soft_core,
        "Merged topology terms."
    );
    for path in result.written_files() {
        println!("  {}", path.display());
    }
    if !result.warnings.is_empty() {
        println!("{} warning(s):", result.warnings.len());
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
    }
    Ok(())
}
