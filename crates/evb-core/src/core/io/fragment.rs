use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

const FRAGMENT_EXTENSION: &str = "opls";

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("Failed to read fragment '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Category of bonded or non-bonded parameters a fragment file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Bonds,
    Angles,
    Torsions,
    Impropers,
    Vdw,
}

impl FragmentKind {
    pub const ALL: [FragmentKind; 5] = [
        FragmentKind::Bonds,
        FragmentKind::Angles,
        FragmentKind::Torsions,
        FragmentKind::Impropers,
        FragmentKind::Vdw,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            FragmentKind::Bonds => "bonds",
            FragmentKind::Angles => "angles",
            FragmentKind::Torsions => "torsions",
            FragmentKind::Impropers => "impropers",
            FragmentKind::Vdw => "vdw",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| name.contains(kind.keyword()))
    }

    fn label_count(self) -> usize {
        match self {
            FragmentKind::Bonds => 2,
            FragmentKind::Angles => 3,
            FragmentKind::Torsions | FragmentKind::Impropers => 4,
            FragmentKind::Vdw => 1,
        }
    }
}

/// A parameter row keyed by atom-type labels.
///
/// For bonds and angles `values` holds the equilibrium value and force constant; for
/// dihedrals it holds every coefficient after the function type; for `vdw` rows it holds
/// sigma and epsilon.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentRow {
    pub line: usize,
    pub labels: Vec<String>,
    pub func: Option<u32>,
    pub values: Vec<f64>,
}

impl FragmentRow {
    pub fn label_refs(&self) -> Vec<&str> {
        self.labels.iter().map(String::as_str).collect()
    }
}

/// A row the parser could not interpret.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub path: PathBuf,
    pub kind: FragmentKind,
    pub rows: Vec<FragmentRow>,
    pub skipped: Vec<SkippedRow>,
}

impl Fragment {
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    pub fn parse(kind: FragmentKind, path: PathBuf, reader: &mut impl BufRead) -> io::Result<Self> {
        let mut rows = Vec::new();
        let mut skipped = Vec::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let raw = line_res?;
            let line = line_num + 1;
            let content = raw.split(';').next().unwrap_or_default();
            let tokens: Vec<&str> = content.split_whitespace().collect();
            match tokens.first() {
                None => continue,
                Some(first) if first.starts_with(['#', ';', '!']) => continue,
                Some(_) => {}
            }
            match parse_row(kind, &tokens) {
                Ok(mut row) => {
                    row.line = line;
                    rows.push(row);
                }
                Err(reason) => skipped.push(SkippedRow { line, reason }),
            }
        }

        Ok(Self {
            path,
            kind,
            rows,
            skipped,
        })
    }

    pub fn load(kind: FragmentKind, path: &Path) -> Result<Self, FragmentError> {
        let io_err = |source| FragmentError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        let mut reader = BufReader::new(file);
        Self::parse(kind, path.to_path_buf(), &mut reader).map_err(io_err)
    }
}

fn parse_row(kind: FragmentKind, tokens: &[&str]) -> Result<FragmentRow, String> {
    let float = |idx: usize| -> Result<f64, String> {
        let token = tokens
            .get(idx)
            .ok_or_else(|| format!("missing column {}", idx + 1))?;
        token
            .parse()
            .map_err(|_| format!("invalid number '{token}' in column {}", idx + 1))
    };

    let labels_end = kind.label_count();
    if tokens.len() <= labels_end {
        return Err(format!("expected more than {labels_end} columns"));
    }
    let labels = tokens[..labels_end].iter().map(|t| t.to_string()).collect();

    if kind == FragmentKind::Vdw {
        return Ok(FragmentRow {
            line: 0,
            labels,
            func: None,
            values: vec![float(6)?, float(7)?],
        });
    }

    let func_token = tokens[labels_end];
    let func = func_token
        .parse()
        .map_err(|_| format!("invalid function type '{func_token}'"))?;
    let values = match kind {
        FragmentKind::Bonds | FragmentKind::Angles => {
            vec![float(labels_end + 1)?, float(labels_end + 2)?]
        }
        _ => (labels_end + 1..tokens.len())
            .map(float)
            .collect::<Result<_, _>>()?,
    };

    Ok(FragmentRow {
        line: 0,
        labels,
        func: Some(func),
        values,
    })
}

/// All fragment files found in a parameter directory.
#[derive(Debug, Clone, Default)]
pub struct FragmentLibrary {
    fragments: Vec<Fragment>,
}

impl FragmentLibrary {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }

    /// Loads every `.opls` file in `dir` whose name identifies a fragment kind, in name order.
    pub fn discover(dir: &Path) -> Result<Self, FragmentError> {
        let io_err = |source| FragmentError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(FRAGMENT_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut fragments = Vec::new();
        for path in paths {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            if let Some(kind) = FragmentKind::from_file_name(name) {
                fragments.push(Fragment::load(kind, &path)?);
            }
        }
        Ok(Self { fragments })
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Fragments of `kind` belonging to any of `residues`, each file at most once.
    pub fn select<S: AsRef<str>>(&self, residues: &[S], kind: FragmentKind) -> Vec<&Fragment> {
        self.fragments
            .iter()
            .filter(|fragment| fragment.kind == kind)
            .filter(|fragment| {
                let name = fragment.file_name();
                residues.iter().any(|res| name.starts_with(res.as_ref()))
            })
            .collect()
    }

    /// Residues of the list that have no fragment of `kind`.
    pub fn missing<'a, S: AsRef<str>>(&self, residues: &'a [S], kind: FragmentKind) -> Vec<&'a str> {
        let mut missing: Vec<&str> = Vec::new();
        for residue in residues {
            let residue = residue.as_ref();
            if missing.contains(&residue) {
                continue;
            }
            if self.select(&[residue], kind).is_empty() {
                missing.push(residue);
            }
        }
        missing
    }
}
