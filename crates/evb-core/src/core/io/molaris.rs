use super::profile::ProfileCurve;
use super::traits::{TextInput, TextOutput};
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// MD steps between two recorded samples, as stamped on every gap record.
pub const SAMPLE_STEP: usize = 10;

const ZERO_FIELD: &str = "   0.00";
const TRAILING_ZEROS: usize = 21;
const CLOSING_LINE: &str = "   0.00   0.00   0.00 0  0";
const RECORD_LINES: usize = 5;

#[derive(Debug, Error)]
pub enum MolarisError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: invalid number '{value}'")]
    Parse { line: usize, value: String },
    #[error("Record ending on line {line} is missing fields")]
    Truncated { line: usize },
}

/// One sample of a gap file: the diabatic energies relative to the reference surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapRecord {
    pub step: usize,
    pub reactant: f64,
    pub product: f64,
}

/// A window in the gap layout read by the Molaris mapping program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GapWindow {
    /// Weight of the product surface.
    pub lambda: f64,
    pub delta_lambda: f64,
    /// Log path stamped on the first record; Molaris expects it in the last window only.
    pub lra_output: Option<String>,
    pub records: Vec<GapRecord>,
}

pub struct GapFile;

fn write_energy_line(writer: &mut impl Write, value: f64) -> io::Result<()> {
    write!(writer, "{ZERO_FIELD}{ZERO_FIELD}   {value:.2}")?;
    for _ in 0..TRAILING_ZEROS {
        write!(writer, "{ZERO_FIELD}")?;
    }
    writeln!(writer)
}

impl TextOutput for GapFile {
    type Input = GapWindow;
    type Error = MolarisError;

    fn write_to(window: &GapWindow, writer: &mut impl Write) -> Result<(), MolarisError> {
        let l1 = 1.0 - window.lambda;
        let l2 = window.lambda;
        for (i, record) in window.records.iter().enumerate() {
            write!(
                writer,
                "          {}   0.001000   0.00   2   {l1:.3}   {l2:.3}   0   {l2:.3}   {:.4}",
                record.step, window.delta_lambda
            )?;
            match (&window.lra_output, i) {
                (Some(path), 0) => writeln!(writer, "   {path}   ")?,
                _ => writeln!(writer)?,
            }
            write_energy_line(writer, record.reactant)?;
            writeln!(writer, "{CLOSING_LINE}")?;
            write_energy_line(writer, record.product)?;
            writeln!(writer, "{CLOSING_LINE}")?;
        }
        Ok(())
    }
}

impl TextInput for GapFile {
    type Output = GapWindow;
    type Error = MolarisError;

    /// Reads the lambda schedule from the first record and the two diabatic energies
    /// from every record. Blank lines are ignored.
    fn read_from(reader: &mut impl BufRead) -> Result<GapWindow, MolarisError> {
        let mut lines = Vec::new();
        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            if !line.trim().is_empty() {
                lines.push((line_num + 1, line));
            }
        }

        let mut window = GapWindow::default();
        for (index, chunk) in lines.chunks(RECORD_LINES).enumerate() {
            let last_line = chunk.last().map_or(0, |(n, _)| *n);
            let [(header_num, header), (rs_num, rs), _, (ps_num, ps), _] = chunk else {
                return Err(MolarisError::Truncated { line: last_line });
            };
            let header: Vec<&str> = header.split_whitespace().collect();
            let step = field(&header, 0, *header_num)?;
            if index == 0 {
                window.lambda = field(&header, 5, *header_num)?;
                window.delta_lambda = field(&header, 8, *header_num)?;
                window.lra_output = header.get(9).map(|s| s.to_string());
            }
            let rs: Vec<&str> = rs.split_whitespace().collect();
            let ps: Vec<&str> = ps.split_whitespace().collect();
            window.records.push(GapRecord {
                step,
                reactant: field(&rs, 2, *rs_num)?,
                product: field(&ps, 2, *ps_num)?,
            });
        }
        Ok(window)
    }
}

fn field<T: std::str::FromStr>(tokens: &[&str], index: usize, line: usize) -> Result<T, MolarisError> {
    let token = tokens.get(index).ok_or(MolarisError::Truncated { line })?;
    token.parse().map_err(|_| MolarisError::Parse {
        line,
        value: token.to_string(),
    })
}

/// The `dG_dE.graph` free-energy curve written by the Molaris mapping program.
pub struct GraphFile;

impl TextInput for GraphFile {
    type Output = ProfileCurve;
    type Error = MolarisError;

    /// Takes the energy gap from the first column and the free energy from the second.
    fn read_from(reader: &mut impl BufRead) -> Result<ProfileCurve, MolarisError> {
        let mut curve = ProfileCurve::default();
        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.first().is_none_or(|t| t.starts_with('#')) {
                continue;
            }
            curve.x.push(field(&tokens, 0, line_num + 1)?);
            curve.y.push(field(&tokens, 1, line_num + 1)?);
        }
        Ok(curve)
    }
}
