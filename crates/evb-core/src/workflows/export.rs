use super::map::{EnergyFiles, read_windows};
use crate::core::estimator::WindowSeries;
use crate::core::io::molaris::{GapFile, GapRecord, GapWindow, SAMPLE_STEP};
use crate::core::io::qfep::{QfepFile, QfepWindow};
use crate::core::io::traits::TextOutput;
use crate::core::topology::writer::window_lambdas;
use crate::engine::config::ExportConfig;
use crate::engine::error::{EvbError, Stage};
use crate::engine::progress::{Phase, Progress, ProgressReporter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub fn qfep_file_name(window: usize) -> String {
    format!("fep_{window:03}.dat")
}

/// Gap files are numbered from one.
pub fn gap_file_name(window: usize) -> String {
    format!("map_evb.gap{:03}", window + 1)
}

/// Sample index with the reactant and product energies relative to the reference, for
/// every `stride`-th sample.
fn relative_rows(series: &WindowSeries, stride: usize) -> impl Iterator<Item = (usize, f64, f64)> + '_ {
    (0..series.len()).step_by(stride.max(1)).map(|j| {
        (
            j,
            series.reactant[j] - series.reference[j],
            series.product[j] - series.reference[j],
        )
    })
}

/// Writes the sampled energies of every window in Q's `qfep` input layout.
///
/// # Errors
///
/// Returns the input errors of [`read_windows`] and [`EvbError::Io`] when an output file
/// cannot be written.
#[instrument(skip_all, name = "export_workflow")]
pub fn qfep(
    files: &EnergyFiles,
    config: &ExportConfig,
    output_dir: &Path,
    reporter: &ProgressReporter,
) -> Result<Vec<PathBuf>, EvbError> {
    let phase = reporter.phase(Phase::EnergyReading);
    let (windows, _) = read_windows(files, &config.input, reporter)?;
    phase.finish();

    let phase = reporter.phase(Phase::QfepExport);
    fs::create_dir_all(output_dir)?;
    let lambdas = window_lambdas(windows.len());
    let written = reporter.task(windows.len(), |reporter| {
        windows
            .iter()
            .zip(lambdas)
            .enumerate()
            .map(|(i, (series, lambda))| -> Result<PathBuf, EvbError> {
                let rows = relative_rows(series, config.stride)
                    .map(|(_, reactant, product)| (reactant, product))
                    .collect();
                let path = output_dir.join(qfep_file_name(i));
                QfepFile::write_to_path(&QfepWindow { lambda, rows }, &path)?;
                reporter.report(Progress::TaskIncrement);
                Ok(path)
            })
            .collect::<Result<Vec<_>, _>>()
    })?;
    info!(files = written.len(), stride = config.stride, "Q input files written.");
    phase.finish();

    Ok(written)
}

/// Writes the sampled energies of every window as gap files for the Molaris mapping
/// program. The last window carries the LRA log path Molaris expects next to the files.
///
/// # Errors
///
/// Returns the input errors of [`read_windows`] and [`EvbError::Io`] when an output file
/// cannot be written.
#[instrument(skip_all, name = "molaris_export_workflow")]
pub fn molaris(
    files: &EnergyFiles,
    config: &ExportConfig,
    output_dir: &Path,
    reporter: &ProgressReporter,
) -> Result<Vec<PathBuf>, EvbError> {
    let phase = reporter.phase(Phase::EnergyReading);
    let (windows, _) = read_windows(files, &config.input, reporter)?;
    phase.finish();

    let phase = reporter.phase(Phase::GapExport);
    fs::create_dir_all(output_dir)?;
    let lra_output = fs::canonicalize(output_dir)?.join("evb_lra.out");
    let lambdas = window_lambdas(windows.len());
    let delta_lambda = lambdas.get(1).copied().unwrap_or(0.0);
    let last = windows.len().saturating_sub(1);

    let written = reporter.task(windows.len(), |reporter| {
        windows
            .iter()
            .zip(lambdas)
            .enumerate()
            .map(|(i, (series, lambda))| -> Result<PathBuf, EvbError> {
                let records = relative_rows(series, config.stride)
                    .map(|(j, reactant, product)| GapRecord {
                        step: j * SAMPLE_STEP,
                        reactant,
                        product,
                    })
                    .collect();
                let window = GapWindow {
                    lambda,
                    delta_lambda,
                    lra_output: (i == last).then(|| lra_output.display().to_string()),
                    records,
                };
                let path = output_dir.join(gap_file_name(i));
                GapFile::write_to_path(&window, &path)
                    .map_err(|e| EvbError::stage(Stage::Export, e))?;
                reporter.report(Progress::TaskIncrement);
                Ok(path)
            })
            .collect::<Result<Vec<_>, _>>()
    })?;
    info!(files = written.len(), stride = config.stride, "Molaris gap files written.");
    phase.finish();

    Ok(written)
}
