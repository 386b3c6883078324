use crate::cli::FitArgs;
use crate::config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use evbkit::{engine::progress::ProgressReporter, workflows};
use std::fs;
use tracing::warn;

pub fn run(args: FitArgs, progress: &CliProgressHandler) -> Result<()> {
    let config = config::analysis_config(&args)?;

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let report = workflows::analyze::fit(&args.files, &config, &reporter)?;

    let rejected = report.rejected().count();
    if rejected > 0 {
        warn!("{} of {} replica fits were rejected.", rejected, report.replicas.len());
    }
    match &args.output {
        Some(path) => {
            fs::write(path, report.to_string())?;
            println!("Fit report written to: {}", path.display());
        }
        None => print!("{}", report),
    }
    Ok(())
}
