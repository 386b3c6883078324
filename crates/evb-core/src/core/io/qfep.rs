use super::traits::TextOutput;
use std::io::{self, Write};

/// Energies of one window in the layout read by Q's `qfep` program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QfepWindow {
    pub lambda: f64,
    /// Reactant and product energies relative to the reference, per sample.
    pub rows: Vec<(f64, f64)>,
}

pub struct QfepFile;

impl TextOutput for QfepFile {
    type Input = QfepWindow;
    type Error = io::Error;

    fn write_to(window: &QfepWindow, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer, "{:.6}    {:.6}", 1.0 - window.lambda, window.lambda)?;
        for (reactant, product) in &window.rows {
            writeln!(writer, "{reactant:.8}    {product:.8}")?;
        }
        Ok(())
    }
}
