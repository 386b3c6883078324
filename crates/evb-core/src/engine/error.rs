use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::config::ConfigError;
use crate::core::estimator::EstimatorError;
use crate::core::topology::TopologyError;

type BoxedError = Box<dyn StdError + Send + Sync>;

/// Pipeline stage named by [`EvbError::Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Parsing,
    Reconciling,
    Pairs,
    SoftCore,
    Windows,
    Reference,
    Tables,
    Energies,
    Estimation,
    Analysis,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parsing => "parsing",
            Stage::Reconciling => "term reconciliation",
            Stage::Pairs => "pair classification",
            Stage::SoftCore => "soft-core assignment",
            Stage::Windows => "window writing",
            Stage::Reference => "reference topology",
            Stage::Tables => "soft-core tables",
            Stage::Energies => "energy reading",
            Stage::Estimation => "free-energy estimation",
            Stage::Analysis => "profile analysis",
            Stage::Export => "energy export",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum EvbError {
    #[error("Input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: BoxedError,
    },

    #[error(
        "Energy file counts differ: {reactant} reactant, {product} product and {reference} reference files"
    )]
    CountMismatch {
        reactant: usize,
        product: usize,
        reference: usize,
    },

    #[error("Numeric domain error in {context} (value: {value})")]
    NumericDomain { context: String, value: f64 },

    #[error("The {stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: BoxedError,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EvbError {
    pub fn parse(path: impl Into<PathBuf>, source: impl Into<BoxedError>) -> Self {
        EvbError::Parse {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn stage(stage: Stage, source: impl Into<BoxedError>) -> Self {
        EvbError::Stage {
            stage,
            source: source.into(),
        }
    }

    /// Wraps a topology failure, keeping it attributed to `stage`.
    pub fn topology(stage: Stage, source: TopologyError) -> Self {
        match source {
            TopologyError::Io(err) => EvbError::Io(err),
            other => EvbError::stage(stage, other),
        }
    }
}

impl From<EstimatorError> for EvbError {
    fn from(err: EstimatorError) -> Self {
        match err {
            EstimatorError::NumericDomain { context, value } => {
                EvbError::NumericDomain { context, value }
            }
            other => EvbError::stage(Stage::Estimation, other),
        }
    }
}

/// Fails with [`EvbError::InputNotFound`] unless `path` exists.
pub fn require_input(path: &Path) -> Result<(), EvbError> {
    if path.exists() {
        Ok(())
    } else {
        Err(EvbError::InputNotFound {
            path: path.to_path_buf(),
        })
    }
}
