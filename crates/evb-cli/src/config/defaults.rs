use evbkit::core::topology::tables::TablePrecision;
use evbkit::engine::config as core_config;
use std::path::PathBuf;

pub struct DefaultsConfig {
    pub cutoff: f64,
    pub precision: TablePrecision,
    pub output_dir: PathBuf,
    pub alpha: f64,
    pub hij: f64,
    pub temperature: f64,
    pub bins: usize,
    pub min_points: usize,
    pub ts_tolerance: f64,
    pub left: usize,
    pub right: usize,
    pub degree: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            cutoff: core_config::DEFAULT_CUTOFF_NM,
            precision: TablePrecision::Single,
            output_dir: PathBuf::from("."),
            alpha: 0.0,
            hij: 0.0,
            temperature: core_config::DEFAULT_TEMPERATURE_K,
            bins: core_config::DEFAULT_BINS,
            min_points: core_config::DEFAULT_MIN_POINTS,
            ts_tolerance: core_config::DEFAULT_TS_TOLERANCE,
            left: core_config::DEFAULT_FIT_TRIM,
            right: core_config::DEFAULT_FIT_TRIM,
            degree: core_config::DEFAULT_FIT_DEGREE,
        }
    }
}
