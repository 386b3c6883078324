use super::stats::format_report;
use crate::cli::MolarisStatsArgs;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use evbkit::engine::progress::ProgressReporter;
use evbkit::workflows;

pub fn run(args: MolarisStatsArgs, progress: &CliProgressHandler) -> Result<()> {
    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let report = workflows::analyze::graph_stats(&args.files, args.csv.as_deref(), &reporter)?;

    println!("Barriers over {} Molaris replica(s):", report.replicas.len());
    println!("{}", format_report(&report));
    if let Some(csv) = &args.csv {
        println!("Per-replica table written to: {}", csv.display());
    }
    Ok(())
}
