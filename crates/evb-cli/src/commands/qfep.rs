use crate::cli::QfepArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use evbkit::engine::config::ExportConfig;
use evbkit::engine::progress::ProgressReporter;
use evbkit::workflows::{self, map::EnergyFiles};

pub fn run(args: QfepArgs, progress: &CliProgressHandler) -> Result<()> {
    let config =
        ExportConfig::with_stride(args.stride).map_err(|e| CliError::Argument(e.to_string()))?;
    let files = EnergyFiles::discover(&args.path)?;

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let written = workflows::export::qfep(&files, &config, &args.output, &reporter)?;

    println!(
        "Wrote {} Q input file(s) to: {}",
        written.len(),
        args.output.display()
    );
    Ok(())
}
