use super::traits::{TextInput, TextOutput};
use std::io::{self, BufRead, Write};

/// Comment line before which the EVB block is inserted.
pub const RESTRAINT_ANCHOR: &str = "; Include Position restraint file";

/// Comment text opening the EVB block of a window topology.
pub const EVB_MARKER: &str = "This section is dedicated to EVB atoms";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionName {
    Atoms,
    Bonds,
    Pairs,
    PairsNb,
    Angles,
    Dihedrals,
    Exclusions,
    Other(String),
}

impl SectionName {
    fn from_header(name: &str) -> Self {
        match name {
            "atoms" => SectionName::Atoms,
            "bonds" => SectionName::Bonds,
            "pairs" => SectionName::Pairs,
            "pairs_nb" => SectionName::PairsNb,
            "angles" => SectionName::Angles,
            "dihedrals" => SectionName::Dihedrals,
            "exclusions" => SectionName::Exclusions,
            other => SectionName::Other(other.to_string()),
        }
    }
}

/// Syntactic class of a topology line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind<'a> {
    Blank,
    Comment,
    /// Preprocessor lines such as `#include` or `#ifdef`.
    Preprocessor,
    Header(SectionName),
    Data(Vec<&'a str>),
}

pub fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with(';') {
        return LineKind::Comment;
    }
    if trimmed.starts_with('#') {
        return LineKind::Preprocessor;
    }
    if let Some(inner) = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.split(']').next())
    {
        return LineKind::Header(SectionName::from_header(inner.trim()));
    }
    let data = trimmed.split(';').next().unwrap_or_default();
    LineKind::Data(data.split_whitespace().collect())
}

/// Tracks the current section while walking a topology line by line.
#[derive(Debug, Clone, Default)]
pub struct SectionCursor {
    current: Option<SectionName>,
}

impl SectionCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `line` and updates the current section on headers.
    pub fn advance<'a>(&mut self, line: &'a str) -> LineKind<'a> {
        let kind = classify(line);
        if let LineKind::Header(name) = &kind {
            self.current = Some(name.clone());
        }
        kind
    }

    pub fn section(&self) -> Option<&SectionName> {
        self.current.as_ref()
    }
}

/// A GROMACS topology held as lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopologyDocument {
    pub lines: Vec<String>,
}

impl TopologyDocument {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Index of the position-restraint include comment, if present.
    pub fn anchor(&self) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.trim_start().starts_with(RESTRAINT_ANCHOR))
    }
}

pub struct TopologyFile;

impl TextInput for TopologyFile {
    type Output = TopologyDocument;
    type Error = io::Error;

    fn read_from(reader: &mut impl BufRead) -> io::Result<TopologyDocument> {
        let lines = reader.lines().collect::<io::Result<Vec<_>>>()?;
        Ok(TopologyDocument::new(lines))
    }
}

impl TextOutput for TopologyFile {
    type Input = [String];
    type Error = io::Error;

    fn write_to(lines: &[String], writer: &mut impl Write) -> io::Result<()> {
        for line in lines {
            writeln!(writer, "{line}")?;
        }
        Ok(())
    }
}
