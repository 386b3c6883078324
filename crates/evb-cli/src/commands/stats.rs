use crate::cli::StatsArgs;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use evbkit::engine::progress::ProgressReporter;
use evbkit::workflows::{self, analyze::StatsReport};

pub(crate) fn format_report(report: &StatsReport) -> String {
    format!(
        "dG#: {:.2} +/- {:.2}\ndG0: {:.2} +/- {:.2}",
        report.activation.mean, report.activation.std, report.reaction.mean, report.reaction.std
    )
}

pub fn run(args: StatsArgs, progress: &CliProgressHandler) -> Result<()> {
    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let report = workflows::analyze::stats(&args.files, args.csv.as_deref(), &reporter)?;

    println!("Barriers over {} replica(s):", report.replicas.len());
    println!("{}", format_report(&report));
    if let Some(csv) = &args.csv {
        println!("Per-replica table written to: {}", csv.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use evbkit::core::estimator::stats::Summary;

    #[test]
    fn report_prints_mean_and_spread() {
        let report = StatsReport {
            replicas: Vec::new(),
            activation: Summary::sample(&[14.0, 16.0]).unwrap(),
            reaction: Summary::sample(&[-3.0, -3.0]).unwrap(),
        };
        assert_eq!(format_report(&report), "dG#: 15.00 +/- 1.41\ndG0: -3.00 +/- 0.00");
    }
}
