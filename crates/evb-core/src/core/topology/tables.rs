use crate::core::io::format::{scientific, table_abscissa};
use crate::core::io::traits::TextOutput;
use serde::Deserialize;
use std::fmt;
use std::io::{self, Write};

/// Distance added to the cut-off so that tables cover the whole neighbour-list range.
const TABLE_EXTENSION: f64 = 1.0;
const MANTISSA_DIGITS: usize = 9;

/// Floating-point precision of the engine build the tables are written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TablePrecision {
    #[default]
    Single,
    Double,
}

impl TablePrecision {
    /// Grid spacing in nm.
    pub fn step(self) -> f64 {
        match self {
            TablePrecision::Single => 0.002,
            TablePrecision::Double => 0.0005,
        }
    }
}

impl fmt::Display for TablePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TablePrecision::Single => write!(f, "single"),
            TablePrecision::Double => write!(f, "double"),
        }
    }
}

/// Tabulated repulsion `exp(-βr)` with its negative derivative, for one decay constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftCoreTable {
    pub beta: f64,
    pub cutoff: f64,
    pub precision: TablePrecision,
}

impl SoftCoreTable {
    pub fn new(beta: f64, cutoff: f64, precision: TablePrecision) -> Self {
        Self {
            beta,
            cutoff,
            precision,
        }
    }

    /// Number of grid points from zero to the extended cut-off, both ends included.
    pub fn len(&self) -> usize {
        let span = self.cutoff + TABLE_EXTENSION;
        (span / self.precision.step() + 1e-9).floor() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// `(r, f(r), -f'(r))` at every grid point.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        let step = self.precision.step();
        (0..self.len()).map(move |i| {
            let r = i as f64 * step;
            let value = (-self.beta * r).exp();
            (r, value, self.beta * value)
        })
    }
}

pub fn table_file_name(table: usize) -> String {
    format!("table_b{table}.xvg")
}

pub struct TableFile;

impl TextOutput for TableFile {
    type Input = SoftCoreTable;
    type Error = io::Error;

    fn write_to(table: &SoftCoreTable, writer: &mut impl Write) -> io::Result<()> {
        for (r, value, force) in table.points() {
            writeln!(
                writer,
                "{}       {}       {}",
                table_abscissa(r),
                scientific(value, MANTISSA_DIGITS),
                scientific(force, MANTISSA_DIGITS)
            )?;
        }
        Ok(())
    }
}
