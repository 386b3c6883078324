use crate::core::estimator::EstimatorError;
use crate::core::estimator::stats::{
    Barriers, FitOutcome, Summary, fit_barriers, split_barriers, walk_barriers,
};
use crate::core::io::molaris::GraphFile;
use crate::core::io::profile::{ProfileCurve, ProfileFile};
use crate::core::io::traits::TextInput;
use crate::engine::config::AnalysisConfig;
use crate::engine::error::{EvbError, Stage, require_input};
use crate::engine::progress::{Phase, Progress, ProgressReporter};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaBarriers {
    pub path: PathBuf,
    pub barriers: Barriers,
}

/// Barrier statistics over replica profiles read by walking each curve.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub replicas: Vec<ReplicaBarriers>,
    /// Sample statistics of ΔG‡.
    pub activation: Summary,
    /// Sample statistics of ΔG0.
    pub reaction: Summary,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    replica: &'a str,
    activation: f64,
    reaction: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaFit {
    pub path: PathBuf,
    pub outcome: FitOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSummary {
    pub activation: Summary,
    pub reaction: Summary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub replicas: Vec<ReplicaFit>,
    /// Population statistics, available only when every replica was accepted.
    pub summary: Option<FitSummary>,
}

impl FitReport {
    pub fn rejected(&self) -> impl Iterator<Item = &ReplicaFit> {
        self.replicas
            .iter()
            .filter(|r| matches!(r.outcome, FitOutcome::Rejected { .. }))
    }
}

impl fmt::Display for FitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for replica in &self.replicas {
            let name = replica.path.display();
            match replica.outcome {
                FitOutcome::Accepted(b) => writeln!(
                    f,
                    "{name}: dG# = {:>7.2}  dG0 = {:>7.2}",
                    b.activation, b.reaction
                )?,
                FitOutcome::Rejected { minima, maxima } => writeln!(
                    f,
                    "{name}: fitted curve has {minima} minima and {maxima} maxima; check the profile"
                )?,
            }
        }
        match &self.summary {
            Some(s) => {
                writeln!(
                    f,
                    "dG#: {:.2} +/- {:.2} (sem {:.2})",
                    s.activation.mean, s.activation.std, s.activation.sem
                )?;
                writeln!(
                    f,
                    "dG0: {:.2} +/- {:.2} (sem {:.2})",
                    s.reaction.mean, s.reaction.std, s.reaction.sem
                )
            }
            None => writeln!(f, "Statistics unavailable: not every replica could be fitted."),
        }
    }
}

fn read_profile(path: &Path) -> Result<ProfileCurve, EvbError> {
    require_input(path)?;
    ProfileFile::read_from_path(path).map_err(|e| EvbError::parse(path, e))
}

fn read_graph(path: &Path) -> Result<ProfileCurve, EvbError> {
    require_input(path)?;
    GraphFile::read_from_path(path).map_err(|e| EvbError::parse(path, e))
}

/// Reads ΔG‡ and ΔG0 from every replica profile and summarises them, optionally writing a
/// per-replica CSV table.
///
/// # Errors
///
/// Returns [`EvbError::InputNotFound`] or [`EvbError::Parse`] for unreadable profiles and
/// [`EvbError::Stage`] when no profile is given, a profile has no reactant or product
/// minimum, or the CSV table cannot be written.
#[instrument(skip_all, name = "stats_workflow")]
pub fn stats(
    paths: &[PathBuf],
    csv_path: Option<&Path>,
    reporter: &ProgressReporter,
) -> Result<StatsReport, EvbError> {
    summarise(paths, csv_path, read_profile, walk_barriers, reporter)
}

/// Summarises `dG_dE.graph` curves from Molaris mapping runs, one per replica. Each curve
/// is split at its midpoint to locate the two minima.
///
/// # Errors
///
/// Returns [`EvbError::InputNotFound`] or [`EvbError::Parse`] for unreadable graphs and
/// [`EvbError::Stage`] when no graph is given, a graph has fewer than two points, or the
/// CSV table cannot be written.
#[instrument(skip_all, name = "graph_stats_workflow")]
pub fn graph_stats(
    paths: &[PathBuf],
    csv_path: Option<&Path>,
    reporter: &ProgressReporter,
) -> Result<StatsReport, EvbError> {
    summarise(paths, csv_path, read_graph, split_barriers, reporter)
}

fn summarise(
    paths: &[PathBuf],
    csv_path: Option<&Path>,
    read: fn(&Path) -> Result<ProfileCurve, EvbError>,
    barriers_of: fn(&[f64]) -> Result<Barriers, EstimatorError>,
    reporter: &ProgressReporter,
) -> Result<StatsReport, EvbError> {
    let phase = reporter.phase(Phase::ReplicaBarriers);
    let replicas = reporter.task(paths.len(), |reporter| {
        paths
            .iter()
            .map(|path| -> Result<ReplicaBarriers, EvbError> {
                let curve = read(path)?;
                let barriers =
                    barriers_of(&curve.y).map_err(|e| EvbError::stage(Stage::Analysis, e))?;
                reporter.report(Progress::TaskIncrement);
                Ok(ReplicaBarriers {
                    path: path.clone(),
                    barriers,
                })
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    let activation: Vec<f64> = replicas.iter().map(|r| r.barriers.activation).collect();
    let reaction: Vec<f64> = replicas.iter().map(|r| r.barriers.reaction).collect();
    let (Some(activation), Some(reaction)) =
        (Summary::sample(&activation), Summary::sample(&reaction))
    else {
        return Err(EvbError::stage(Stage::Analysis, "no profiles were given"));
    };

    if let Some(csv_path) = csv_path {
        write_csv(csv_path, &replicas)?;
    }
    info!(
        replicas = replicas.len(),
        activation = activation.mean,
        reaction = reaction.mean,
        "Replica statistics computed."
    );
    phase.finish();

    Ok(StatsReport {
        replicas,
        activation,
        reaction,
    })
}

fn write_csv(path: &Path, replicas: &[ReplicaBarriers]) -> Result<(), EvbError> {
    let csv_err = |e: csv::Error| EvbError::stage(Stage::Analysis, e);
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for replica in replicas {
        let name = replica.path.to_string_lossy();
        writer
            .serialize(CsvRow {
                replica: &name,
                activation: replica.barriers.activation,
                reaction: replica.barriers.reaction,
            })
            .map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

/// Fits a polynomial to every replica profile and summarises the accepted barriers.
///
/// # Errors
///
/// Returns [`EvbError::InputNotFound`] or [`EvbError::Parse`] for unreadable profiles and
/// [`EvbError::Stage`] when a profile is too short for the fit.
#[instrument(skip_all, name = "fit_workflow")]
pub fn fit(
    paths: &[PathBuf],
    config: &AnalysisConfig,
    reporter: &ProgressReporter,
) -> Result<FitReport, EvbError> {
    let phase = reporter.phase(Phase::PolynomialFits);
    let replicas = reporter.task(paths.len(), |reporter| {
        paths
            .iter()
            .map(|path| -> Result<ReplicaFit, EvbError> {
                let curve = read_profile(path)?;
                let outcome = fit_barriers(&curve.x, &curve.y, config.degree, config.left, config.right)
                    .map_err(|e| EvbError::stage(Stage::Analysis, e))?;
                if let FitOutcome::Rejected { minima, maxima } = outcome {
                    warn!(
                        path = %path.display(),
                        minima,
                        maxima,
                        "Fitted profile does not show two minima and one maximum."
                    );
                }
                reporter.report(Progress::TaskIncrement);
                Ok(ReplicaFit {
                    path: path.clone(),
                    outcome,
                })
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    let accepted: Vec<Barriers> = replicas
        .iter()
        .filter_map(|r| match r.outcome {
            FitOutcome::Accepted(b) => Some(b),
            FitOutcome::Rejected { .. } => None,
        })
        .collect();
    let summary = if accepted.len() == replicas.len() {
        let activation: Vec<f64> = accepted.iter().map(|b| b.activation).collect();
        let reaction: Vec<f64> = accepted.iter().map(|b| b.reaction).collect();
        Summary::population(&activation)
            .zip(Summary::population(&reaction))
            .map(|(activation, reaction)| FitSummary {
                activation,
                reaction,
            })
    } else {
        None
    };
    info!(
        replicas = replicas.len(),
        accepted = accepted.len(),
        "Polynomial fits finished."
    );
    phase.finish();

    Ok(FitReport { replicas, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::profile::PROFILE_HEADER;
    use std::fs;
    use tempfile::tempdir;

    const TOLERANCE: f64 = 1e-9;

    fn write_profile(dir: &Path, name: &str, x: &[f64], y: &[f64]) -> PathBuf {
        let mut text = format!("{PROFILE_HEADER}\n");
        for (xi, yi) in x.iter().zip(y) {
            text.push_str(&format!("{xi:>8.3}  {yi:>8.3}  {yi:>8.3}  {yi:>8.3}\n"));
        }
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn double_well(tilt: f64) -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..61).map(|i| i as f64 * 0.1 - 3.0).collect();
        let y = x.iter().map(|v| (v * v - 4.0).powi(2) / 4.0 + tilt * v).collect();
        (x, y)
    }

    #[test]
    fn stats_average_walked_barriers() {
        let dir = tempdir().unwrap();
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let paths = vec![
            write_profile(dir.path(), "rep_000.dat", &x, &[2.0, 0.0, 3.0, 5.0, 3.0, -1.0, 1.0]),
            write_profile(dir.path(), "rep_001.dat", &x, &[2.0, 0.0, 3.0, 7.0, 3.0, -3.0, 1.0]),
        ];
        let report = stats(&paths, None, &ProgressReporter::new()).unwrap();
        assert_eq!(report.replicas.len(), 2);
        assert!((report.activation.mean - 6.0).abs() < TOLERANCE);
        assert!((report.reaction.mean + 2.0).abs() < TOLERANCE);
        assert!((report.activation.std - 2f64.sqrt()).abs() < TOLERANCE);
    }

    #[test]
    fn stats_writes_csv_table() {
        let dir = tempdir().unwrap();
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let paths = vec![write_profile(dir.path(), "rep_000.dat", &x, &[1.0, 0.0, 4.0, -1.0, 0.0])];
        let csv_path = dir.path().join("barriers.csv");
        stats(&paths, Some(&csv_path), &ProgressReporter::new()).unwrap();
        let text = fs::read_to_string(&csv_path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("replica,activation,reaction"));
        let row = lines.next().unwrap();
        assert!(row.ends_with(",4.0,-1.0"), "{row}");
    }

    #[test]
    fn stats_without_profiles_is_an_error() {
        let err = stats(&[], None, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(
            err,
            EvbError::Stage {
                stage: Stage::Analysis,
                ..
            }
        ));
    }

    #[test]
    fn fit_summarises_accepted_replicas() {
        let dir = tempdir().unwrap();
        let (x, y1) = double_well(0.25);
        let (_, y2) = double_well(0.20);
        let paths = vec![
            write_profile(dir.path(), "rep_000.dat", &x, &y1),
            write_profile(dir.path(), "rep_001.dat", &x, &y2),
        ];
        let report = fit(&paths, &AnalysisConfig::default(), &ProgressReporter::new()).unwrap();
        assert_eq!(report.rejected().count(), 0);
        let summary = report.summary.unwrap();
        assert_eq!(summary.activation.count, 2);
        assert!(summary.reaction.mean > 0.6 && summary.reaction.mean < 1.2);
        assert!(report.to_string().contains("dG#:"));
    }

    #[test]
    fn one_rejected_replica_withholds_the_summary() {
        let dir = tempdir().unwrap();
        let (x, y) = double_well(0.25);
        let single: Vec<f64> = x.iter().map(|v| v * v).collect();
        let paths = vec![
            write_profile(dir.path(), "rep_000.dat", &x, &y),
            write_profile(dir.path(), "rep_001.dat", &x, &single),
        ];
        let report = fit(&paths, &AnalysisConfig::default(), &ProgressReporter::new()).unwrap();
        assert_eq!(report.rejected().count(), 1);
        assert!(report.summary.is_none());
        assert!(report.to_string().contains("Statistics unavailable"));
    }

    #[test]
    fn missing_profile_is_reported() {
        let err = fit(
            &[PathBuf::from("/nowhere/rep_000.dat")],
            &AnalysisConfig::default(),
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EvbError::InputNotFound { .. }));
    }

    fn write_graph(dir: &Path, name: &str, y: &[f64]) -> PathBuf {
        let text: String = y
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{:>10.2}  {v:>8.2}\n", i as f64 * 10.0 - 100.0))
            .collect();
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn graph_stats_split_each_curve_at_its_midpoint() {
        let dir = tempdir().unwrap();
        let paths = vec![
            write_graph(dir.path(), "dG_dE_1.graph", &[3.0, 0.0, 2.0, 12.0, 6.0, -4.0, -1.0, 2.0]),
            write_graph(dir.path(), "dG_dE_2.graph", &[3.0, 0.0, 2.0, 14.0, 6.0, -2.0, -1.0, 2.0]),
        ];
        let csv_path = dir.path().join("graphs.csv");
        let report = graph_stats(&paths, Some(&csv_path), &ProgressReporter::new()).unwrap();

        assert_eq!(report.replicas.len(), 2);
        assert!((report.activation.mean - 13.0).abs() < TOLERANCE);
        assert!((report.reaction.mean + 3.0).abs() < TOLERANCE);
        assert!((report.activation.std - 2f64.sqrt()).abs() < TOLERANCE);
        assert!((report.activation.sem - 1.0).abs() < TOLERANCE);
        let table = fs::read_to_string(&csv_path).unwrap();
        assert!(table.lines().nth(1).unwrap().ends_with(",12.0,-4.0"));
    }

    #[test]
    fn malformed_graph_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dG_dE.graph");
        fs::write(&path, "-100.0 1.0\n-90.0 n/a\n").unwrap();
        let err = graph_stats(&[path], None, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EvbError::Parse { .. }));
    }
}
