use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Header lines GROMACS writes before the data of an energy file.
pub const DEFAULT_HEADER_LINES: usize = 24;

#[derive(Debug, Error)]
pub enum XvgError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XvgParseErrorKind },
}

#[derive(Debug, Error, PartialEq)]
pub enum XvgParseErrorKind {
    #[error("Row has no energy column")]
    MissingColumn,
    #[error("Invalid energy value '{0}'")]
    InvalidFloat(String),
}

/// Reader for the energy column of a GROMACS `.xvg` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XvgReader {
    header_lines: usize,
}

impl Default for XvgReader {
    fn default() -> Self {
        Self {
            header_lines: DEFAULT_HEADER_LINES,
        }
    }
}

impl XvgReader {
    pub fn new(header_lines: usize) -> Self {
        Self { header_lines }
    }

    /// Second column of every data row after the header, in file units.
    ///
    /// Blank rows and `#`/`@` metadata rows after the header are ignored.
    pub fn read_from(&self, reader: &mut impl BufRead) -> Result<Vec<f64>, XvgError> {
        let mut values = Vec::new();
        for (line_num, line_res) in reader.lines().enumerate().skip(self.header_lines) {
            let line = line_res?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(['#', '@']) {
                continue;
            }
            let token = trimmed.split_whitespace().nth(1).ok_or(XvgError::Parse {
                line: line_num + 1,
                kind: XvgParseErrorKind::MissingColumn,
            })?;
            let value = token.parse().map_err(|_| XvgError::Parse {
                line: line_num + 1,
                kind: XvgParseErrorKind::InvalidFloat(token.to_string()),
            })?;
            values.push(value);
        }
        Ok(values)
    }

    pub fn read_from_path<P: AsRef<Path>>(&self, path: P) -> Result<Vec<f64>, XvgError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        self.read_from(&mut reader)
    }
}
