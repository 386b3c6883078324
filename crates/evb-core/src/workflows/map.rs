use crate::core::estimator::basins::BasinWarning;
use crate::core::estimator::{self, ProfileReport, WindowSeries, zwanzig};
use crate::core::io::profile::{ProfileError, ProfileFile};
use crate::core::io::traits::TextOutput;
use crate::core::io::xvg::XvgReader;
use crate::engine::config::{EnergyInput, MappingConfig};
use crate::engine::error::{EvbError, require_input};
use crate::engine::progress::{Phase, Progress, ProgressReporter};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

const ENERGY_EXTENSION: &str = "xvg";
const REACTANT_TAG: &str = "sysA";
const PRODUCT_TAG: &str = "sysB";
const REFERENCE_TAG: &str = "evbless";

/// Energy files of every window, one list per surface, in window order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyFiles {
    pub reactant: Vec<PathBuf>,
    pub product: Vec<PathBuf>,
    pub reference: Vec<PathBuf>,
}

impl EnergyFiles {
    /// Collects the `.xvg` files of `dir` by the surface tag in their names, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`EvbError::InputNotFound`] if `dir` does not exist.
    pub fn discover(dir: &Path) -> Result<Self, EvbError> {
        require_input(dir)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ENERGY_EXTENSION) {
                names.push(path);
            }
        }
        names.sort();

        let tagged = |tag: &str| -> Vec<PathBuf> {
            names
                .iter()
                .filter(|path| {
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.contains(tag))
                })
                .cloned()
                .collect()
        };
        Ok(Self {
            reactant: tagged(REACTANT_TAG),
            product: tagged(PRODUCT_TAG),
            reference: tagged(REFERENCE_TAG),
        })
    }

    /// Number of windows, which every surface must agree on.
    ///
    /// # Errors
    ///
    /// Returns [`EvbError::CountMismatch`] when the three lists differ in length.
    pub fn window_count(&self) -> Result<usize, EvbError> {
        let (reactant, product, reference) =
            (self.reactant.len(), self.product.len(), self.reference.len());
        if reactant != product || reactant != reference {
            return Err(EvbError::CountMismatch {
                reactant,
                product,
                reference,
            });
        }
        Ok(reactant)
    }
}

/// Recoverable findings of a mapping run.
#[derive(Debug, Clone, PartialEq)]
pub enum MapWarning {
    /// The three series of a window had different lengths and were cut to the shortest.
    Truncated {
        window: usize,
        lengths: [usize; 3],
        kept: usize,
    },
    Basin(BasinWarning),
}

impl fmt::Display for MapWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapWarning::Truncated {
                window,
                lengths: [a, b, r],
                kept,
            } => write!(
                f,
                "Window {window} has {a} reactant, {b} product and {r} reference samples; \
                 only the first {kept} are used"
            ),
            MapWarning::Basin(warning) => write!(f, "{warning}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapResult {
    pub report: ProfileReport,
    pub warnings: Vec<MapWarning>,
    pub output: Option<PathBuf>,
}

/// Reads every window's energies, applying the header and warm-up skips, unit scaling and
/// truncation to a common length.
///
/// The warm-up is sized from the data rows of the first reactant file and applied to
/// every file.
///
/// # Errors
///
/// Returns [`EvbError::CountMismatch`] when the surfaces have different file counts,
/// [`EvbError::InputNotFound`] for a missing file and [`EvbError::Parse`] for an
/// unreadable one.
pub fn read_windows(
    files: &EnergyFiles,
    input: &EnergyInput,
    reporter: &ProgressReporter,
) -> Result<(Vec<WindowSeries>, Vec<MapWarning>), EvbError> {
    let count = files.window_count()?;
    let reader = XvgReader::new(input.header_lines);
    let read = |path: &PathBuf| -> Result<Vec<f64>, EvbError> {
        require_input(path)?;
        reader
            .read_from_path(path)
            .map_err(|e| EvbError::parse(path, e))
    };

    let mut skip = None;
    let mut warnings = Vec::new();
    let windows = reporter.task(count, |reporter| {
        (0..count)
            .map(|window| -> Result<WindowSeries, EvbError> {
                let series = [
                    read(&files.reactant[window])?,
                    read(&files.product[window])?,
                    read(&files.reference[window])?,
                ];
                let skip = *skip.get_or_insert_with(|| input.warm_up.samples(series[0].len()));
                let lengths = series.each_ref().map(|s| s.len().saturating_sub(skip));
                let kept = lengths.iter().copied().min().unwrap_or(0);
                if lengths.iter().any(|&len| len != kept) {
                    let warning = MapWarning::Truncated {
                        window,
                        lengths,
                        kept,
                    };
                    warn!("{warning}");
                    warnings.push(warning);
                }

                let [reactant, product, reference] = series.each_ref().map(|values| {
                    values
                        .iter()
                        .skip(skip)
                        .take(kept)
                        .map(|v| v * input.energy_scale)
                        .collect::<Vec<f64>>()
                });
                debug!(window, samples = kept, skipped = skip, "Window energies read.");
                reporter.report(Progress::TaskIncrement);
                Ok(WindowSeries {
                    reactant,
                    product,
                    reference,
                })
            })
            .collect::<Result<Vec<_>, _>>()
    })?;
    Ok((windows, warnings))
}

/// Maps sampled energies onto a free-energy profile and optionally writes it to `output`.
///
/// # Errors
///
/// Returns the input errors of [`read_windows`], [`EvbError::Config`] for fewer than two
/// windows, [`EvbError::NumericDomain`] when an exponential average overflows and
/// [`EvbError::Stage`] for any other estimator failure.
#[instrument(skip_all, name = "map_workflow")]
pub fn run(
    files: &EnergyFiles,
    config: &MappingConfig,
    output: Option<&Path>,
    reporter: &ProgressReporter,
) -> Result<MapResult, EvbError> {
    // === Phase 1: Energies ===
    let phase = reporter.phase(Phase::EnergyReading);
    let (windows, mut warnings) = read_windows(files, &config.input, reporter)?;
    let params = config.parameters(windows.len())?;
    info!(
        windows = windows.len(),
        delta_lambda = params.delta_lambda,
        kt = params.kt,
        "Energy series loaded."
    );
    let mapped = estimator::map_windows(&windows, &params)?;
    phase.finish();

    // === Phase 2: Zwanzig exponential averaging ===
    let phase = reporter.phase(Phase::ZwanzigAveraging);
    let free_energies = zwanzig::window_free_energies(&mapped, params.kt, params.delta_lambda)?;
    if let Some(last) = free_energies.last() {
        info!(total = last, "Window free energies computed.");
    }
    phase.finish();

    // === Phase 3: Binning ===
    let phase = reporter.phase(Phase::WindowMapping);
    let report = estimator::profile_from(&mapped, free_energies, &params)?;
    for warning in &report.stationary.warnings {
        warn!("{warning}");
        warnings.push(MapWarning::Basin(*warning));
    }
    info!(
        points = report.profile.len(),
        barrier = report.barrier(),
        reaction = report.reaction_free_energy(),
        "Free-energy profile mapped."
    );

    let output = match output {
        Some(path) => {
            ProfileFile::write_to_path(&report.profile, path).map_err(|e| match e {
                ProfileError::Io(io) => EvbError::Io(io),
                other => EvbError::parse(path, other),
            })?;
            Some(path.to_path_buf())
        }
        None => None,
    };
    phase.finish();

    Ok(MapResult {
        report,
        warnings,
        output,
    })
}
