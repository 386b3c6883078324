use crate::core::estimator::{BOLTZMANN_KCAL, KJ_PER_KCAL, MappingParameters};
use crate::core::io::xvg::DEFAULT_HEADER_LINES;
use crate::core::topology::tables::TablePrecision;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid parameter: {0}")]
    Invalid(String),
}

pub const DEFAULT_CUTOFF_NM: f64 = 1.0;
pub const DEFAULT_TEMPERATURE_K: f64 = 300.0;
pub const DEFAULT_BINS: usize = 100;
pub const DEFAULT_MIN_POINTS: usize = 10;
pub const DEFAULT_TS_TOLERANCE: f64 = 0.5;
pub const DEFAULT_FIT_DEGREE: usize = 6;
pub const DEFAULT_FIT_TRIM: usize = 3;
/// kcal per kJ with the precision Q expects.
pub const QFEP_ENERGY_SCALE: f64 = 0.239006;

#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub directive_path: PathBuf,
    pub topology_path: PathBuf,
    pub fragments_dir: PathBuf,
    pub reactant_residues: Vec<String>,
    pub product_residues: Vec<String>,
    pub window_count: usize,
    /// Non-bonded cut-off in nm; tables extend 1 nm beyond it.
    pub cutoff: f64,
    pub precision: TablePrecision,
    pub output_dir: PathBuf,
}

#[derive(Default)]
pub struct BuildConfigBuilder {
    directive_path: Option<PathBuf>,
    topology_path: Option<PathBuf>,
    fragments_dir: Option<PathBuf>,
    reactant_residues: Option<Vec<String>>,
    product_residues: Option<Vec<String>>,
    window_count: Option<usize>,
    cutoff: Option<f64>,
    precision: Option<TablePrecision>,
    output_dir: Option<PathBuf>,
}

impl BuildConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directive_path(mut self, path: PathBuf) -> Self {
        self.directive_path = Some(path);
        self
    }
    pub fn topology_path(mut self, path: PathBuf) -> Self {
        self.topology_path = Some(path);
        self
    }
    pub fn fragments_dir(mut self, dir: PathBuf) -> Self {
        self.fragments_dir = Some(dir);
        self
    }
    pub fn reactant_residues(mut self, residues: Vec<String>) -> Self {
        self.reactant_residues = Some(residues);
        self
    }
    pub fn product_residues(mut self, residues: Vec<String>) -> Self {
        self.product_residues = Some(residues);
        self
    }
    pub fn window_count(mut self, count: usize) -> Self {
        self.window_count = Some(count);
        self
    }
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
    pub fn precision(mut self, precision: TablePrecision) -> Self {
        self.precision = Some(precision);
        self
    }
    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }

    pub fn build(self) -> Result<BuildConfig, ConfigError> {
        let window_count = self
            .window_count
            .ok_or(ConfigError::MissingParameter("window_count"))?;
        if window_count < 2 {
            return Err(ConfigError::Invalid(format!(
                "at least two windows are required, got {window_count}"
            )));
        }
        let cutoff = self.cutoff.unwrap_or(DEFAULT_CUTOFF_NM);
        if !(cutoff.is_finite() && cutoff > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "cut-off must be positive, got {cutoff}"
            )));
        }
        let reactant_residues = self
            .reactant_residues
            .ok_or(ConfigError::MissingParameter("reactant_residues"))?;
        let product_residues = self
            .product_residues
            .ok_or(ConfigError::MissingParameter("product_residues"))?;
        if reactant_residues.is_empty() || product_residues.is_empty() {
            return Err(ConfigError::Invalid(
                "reactant and product residue lists must not be empty".to_string(),
            ));
        }

        Ok(BuildConfig {
            directive_path: self
                .directive_path
                .ok_or(ConfigError::MissingParameter("directive_path"))?,
            topology_path: self
                .topology_path
                .ok_or(ConfigError::MissingParameter("topology_path"))?,
            fragments_dir: self
                .fragments_dir
                .ok_or(ConfigError::MissingParameter("fragments_dir"))?,
            reactant_residues,
            product_residues,
            window_count,
            cutoff,
            precision: self.precision.unwrap_or_default(),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

/// Samples discarded from the start of every energy series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WarmUp {
    /// A fixed number of samples.
    Samples(usize),
    /// A tenth of the data rows of the first reactant file.
    Tenth,
}

impl WarmUp {
    /// Number of samples to drop from series whose first reference has `len` rows.
    pub fn samples(self, len: usize) -> usize {
        match self {
            WarmUp::Samples(n) => n,
            WarmUp::Tenth => len / 10,
        }
    }
}

/// Reading of GROMACS energy files shared by mapping and Q export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyInput {
    pub header_lines: usize,
    pub warm_up: WarmUp,
    /// Factor applied to every energy after reading.
    pub energy_scale: f64,
}

impl Default for EnergyInput {
    fn default() -> Self {
        Self {
            header_lines: DEFAULT_HEADER_LINES,
            warm_up: WarmUp::Tenth,
            energy_scale: 1.0 / KJ_PER_KCAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingConfig {
    pub alpha: f64,
    pub hij: f64,
    pub temperature: f64,
    pub bins: usize,
    pub min_points: usize,
    pub delta_lambda: Option<f64>,
    pub ts_tolerance: f64,
    pub input: EnergyInput,
}

impl MappingConfig {
    pub fn kt(&self) -> f64 {
        BOLTZMANN_KCAL * self.temperature
    }

    /// Estimator parameters for a run over `window_count` windows.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for fewer than two windows.
    pub fn parameters(&self, window_count: usize) -> Result<MappingParameters, ConfigError> {
        if window_count < 2 {
            return Err(ConfigError::Invalid(format!(
                "at least two windows are required, found {window_count}"
            )));
        }
        Ok(MappingParameters {
            alpha: self.alpha,
            hij: self.hij,
            kt: self.kt(),
            delta_lambda: self
                .delta_lambda
                .unwrap_or(1.0 / (window_count - 1) as f64),
            bins: self.bins,
            min_points: self.min_points,
            ts_tolerance: self.ts_tolerance,
        })
    }
}

#[derive(Default)]
pub struct MappingConfigBuilder {
    alpha: Option<f64>,
    hij: Option<f64>,
    temperature: Option<f64>,
    bins: Option<usize>,
    min_points: Option<usize>,
    warm_up: Option<WarmUp>,
    delta_lambda: Option<f64>,
    header_lines: Option<usize>,
    energy_scale: Option<f64>,
    ts_tolerance: Option<f64>,
}

impl MappingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }
    pub fn hij(mut self, hij: f64) -> Self {
        self.hij = Some(hij);
        self
    }
    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.temperature = Some(kelvin);
        self
    }
    pub fn bins(mut self, bins: usize) -> Self {
        self.bins = Some(bins);
        self
    }
    pub fn min_points(mut self, n: usize) -> Self {
        self.min_points = Some(n);
        self
    }
    pub fn warm_up(mut self, warm_up: WarmUp) -> Self {
        self.warm_up = Some(warm_up);
        self
    }
    pub fn delta_lambda(mut self, step: f64) -> Self {
        self.delta_lambda = Some(step);
        self
    }
    pub fn header_lines(mut self, lines: usize) -> Self {
        self.header_lines = Some(lines);
        self
    }
    pub fn energy_scale(mut self, scale: f64) -> Self {
        self.energy_scale = Some(scale);
        self
    }
    pub fn ts_tolerance(mut self, tolerance: f64) -> Self {
        self.ts_tolerance = Some(tolerance);
        self
    }

    pub fn build(self) -> Result<MappingConfig, ConfigError> {
        let temperature = self.temperature.unwrap_or(DEFAULT_TEMPERATURE_K);
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be positive, got {temperature}"
            )));
        }
        let bins = self.bins.unwrap_or(DEFAULT_BINS);
        if bins == 0 {
            return Err(ConfigError::Invalid("bin count must be positive".to_string()));
        }
        if let Some(step) = self.delta_lambda
            && !(step.is_finite() && step > 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "lambda step must be positive, got {step}"
            )));
        }
        let defaults = EnergyInput::default();

        Ok(MappingConfig {
            alpha: self.alpha.unwrap_or(0.0),
            hij: self.hij.unwrap_or(0.0),
            temperature,
            bins,
            min_points: self.min_points.unwrap_or(DEFAULT_MIN_POINTS),
            delta_lambda: self.delta_lambda,
            ts_tolerance: self.ts_tolerance.unwrap_or(DEFAULT_TS_TOLERANCE),
            input: EnergyInput {
                header_lines: self.header_lines.unwrap_or(defaults.header_lines),
                warm_up: self.warm_up.unwrap_or(defaults.warm_up),
                energy_scale: self.energy_scale.unwrap_or(defaults.energy_scale),
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub left: usize,
    pub right: usize,
    pub degree: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            left: DEFAULT_FIT_TRIM,
            right: DEFAULT_FIT_TRIM,
            degree: DEFAULT_FIT_DEGREE,
        }
    }
}

#[derive(Default)]
pub struct AnalysisConfigBuilder {
    left: Option<usize>,
    right: Option<usize>,
    degree: Option<usize>,
}

impl AnalysisConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn left(mut self, points: usize) -> Self {
        self.left = Some(points);
        self
    }
    pub fn right(mut self, points: usize) -> Self {
        self.right = Some(points);
        self
    }
    pub fn degree(mut self, degree: usize) -> Self {
        self.degree = Some(degree);
        self
    }

    pub fn build(self) -> Result<AnalysisConfig, ConfigError> {
        let defaults = AnalysisConfig::default();
        let degree = self.degree.unwrap_or(defaults.degree);
        if degree < 2 {
            return Err(ConfigError::Invalid(format!(
                "a degree of at least 2 is needed to locate a barrier, got {degree}"
            )));
        }
        Ok(AnalysisConfig {
            left: self.left.unwrap_or(defaults.left),
            right: self.right.unwrap_or(defaults.right),
            degree,
        })
    }
}

/// Q-format export of sampled energies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportConfig {
    /// Every `stride`-th sample is written.
    pub stride: usize,
    pub input: EnergyInput,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            stride: 1,
            input: EnergyInput {
                warm_up: WarmUp::Samples(0),
                energy_scale: QFEP_ENERGY_SCALE,
                ..EnergyInput::default()
            },
        }
    }
}

impl ExportConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero stride.
    pub fn with_stride(stride: usize) -> Result<Self, ConfigError> {
        if stride == 0 {
            return Err(ConfigError::Invalid("stride must be positive".to_string()));
        }
        Ok(Self {
            stride,
            ..Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_builder() -> BuildConfigBuilder {
        BuildConfigBuilder::new()
            .directive_path("evb.dat".into())
            .topology_path("topol.top".into())
            .fragments_dir("ff".into())
            .reactant_residues(vec!["ACE".into()])
            .product_residues(vec!["ACP".into()])
            .window_count(11)
    }

    #[test]
    fn build_config_applies_defaults() {
        let config = build_builder().build().unwrap();
        assert_eq!(config.cutoff, DEFAULT_CUTOFF_NM);
        assert_eq!(config.precision, TablePrecision::Single);
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn build_config_requires_a_directive() {
        let err = BuildConfigBuilder::new()
            .topology_path("topol.top".into())
            .fragments_dir("ff".into())
            .reactant_residues(vec!["ACE".into()])
            .product_residues(vec!["ACP".into()])
            .window_count(3)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("directive_path"));
    }

    #[test]
    fn build_config_rejects_single_window() {
        let err = build_builder().window_count(1).build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn build_config_rejects_empty_residue_list() {
        let err = build_builder().product_residues(Vec::new()).build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn mapping_defaults_follow_gromacs_output() {
        let config = MappingConfigBuilder::new().build().unwrap();
        assert_eq!(config.bins, DEFAULT_BINS);
        assert_eq!(config.min_points, DEFAULT_MIN_POINTS);
        assert_eq!(config.input.header_lines, 24);
        assert_eq!(config.input.warm_up, WarmUp::Tenth);
        assert!((config.input.energy_scale * 4.184 - 1.0).abs() < 1e-12);
        assert!((config.kt() - 0.5961).abs() < 1e-9);
    }

    #[test]
    fn mapping_parameters_default_lambda_step_spans_all_windows() {
        let config = MappingConfigBuilder::new().alpha(2.0).hij(10.0).build().unwrap();
        let params = config.parameters(21).unwrap();
        assert!((params.delta_lambda - 0.05).abs() < 1e-12);
        assert_eq!(params.alpha, 2.0);
        assert_eq!(params.hij, 10.0);
    }

    #[test]
    fn mapping_parameters_honour_lambda_override() {
        let config = MappingConfigBuilder::new().delta_lambda(0.1).build().unwrap();
        assert_eq!(config.parameters(5).unwrap().delta_lambda, 0.1);
    }

    #[test]
    fn mapping_parameters_need_two_windows() {
        let config = MappingConfigBuilder::new().build().unwrap();
        assert!(matches!(config.parameters(1), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn mapping_rejects_non_positive_temperature() {
        let err = MappingConfigBuilder::new().temperature(0.0).build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn warm_up_skips_a_tenth_by_default() {
        assert_eq!(WarmUp::Tenth.samples(1005), 100);
        assert_eq!(WarmUp::Samples(7).samples(1005), 7);
    }

    #[test]
    fn analysis_defaults_match_sextic_fit() {
        let config = AnalysisConfigBuilder::new().left(5).build().unwrap();
        assert_eq!(config.left, 5);
        assert_eq!(config.right, DEFAULT_FIT_TRIM);
        assert_eq!(config.degree, DEFAULT_FIT_DEGREE);
    }

    #[test]
    fn export_stride_must_be_positive() {
        assert!(ExportConfig::with_stride(0).is_err());
        let config = ExportConfig::with_stride(5).unwrap();
        assert_eq!(config.stride, 5);
        assert_eq!(config.input.energy_scale, QFEP_ENERGY_SCALE);
    }
}
