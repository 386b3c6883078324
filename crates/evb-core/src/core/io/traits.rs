use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for parsing one of the toolkit's text formats.
///
/// Implementors are unit types naming a format; the parsed representation is their
/// associated [`Output`](TextInput::Output).
pub trait TextInput {
    /// The in-memory representation produced by the parser.
    type Output;

    /// The error type for parsing and I/O failures.
    type Error: Error + From<io::Error>;

    /// Parses the format from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if a line cannot be read or does not follow the format.
    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error>;

    /// Parses the format from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self::Output, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}

/// Defines the interface for serializing one of the toolkit's text formats.
pub trait TextOutput {
    /// The in-memory representation accepted by the writer.
    type Input: ?Sized;

    /// The error type for serialization and I/O failures.
    type Error: Error + From<io::Error>;

    /// Writes `data` to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(data: &Self::Input, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Writes `data` to a file path, creating or truncating the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(data: &Self::Input, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(data, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
