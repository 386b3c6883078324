use crate::cli::MolarisArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use evbkit::engine::config::ExportConfig;
use evbkit::engine::progress::ProgressReporter;
use evbkit::workflows::{self, map::EnergyFiles};

pub fn run(args: MolarisArgs, progress: &CliProgressHandler) -> Result<()> {
    let config =
        ExportConfig::with_stride(args.stride).map_err(|e| CliError::Argument(e.to_string()))?;
    let files = EnergyFiles::discover(&args.path)?;

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let written = workflows::export::molaris(&files, &config, &args.output, &reporter)?;

    println!(
        "Wrote {} Molaris gap file(s) to: {}",
        written.len(),
        args.output.display()
    );
    Ok(())
}
