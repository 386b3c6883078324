use crate::error::{CliError, Result};
use evbkit::core::topology::tables::TablePrecision;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileBuildConfig {
    pub directive: Option<PathBuf>,
    pub topology: Option<PathBuf>,
    pub fragments: Option<PathBuf>,
    pub reactants: Option<Vec<String>>,
    pub products: Option<Vec<String>>,
    pub windows: Option<usize>,
    pub cutoff: Option<f64>,
    pub precision: Option<TablePrecision>,
    pub output: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileMappingConfig {
    pub alpha: Option<f64>,
    pub hij: Option<f64>,
    pub temperature: Option<f64>,
    pub bins: Option<usize>,
    pub min_points: Option<usize>,
    pub skip: Option<usize>,
    pub delta_lambda: Option<f64>,
    pub header_lines: Option<usize>,
    pub energy_scale: Option<f64>,
    pub ts_tolerance: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileAnalysisConfig {
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub degree: Option<usize>,
}

/// Contents of a `--config` TOML file; every section and key is optional.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub build: Option<FileBuildConfig>,
    pub mapping: Option<FileMappingConfig>,
    pub analysis: Option<FileAnalysisConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads `path` when given, otherwise starts from an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
