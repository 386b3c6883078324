use super::traits::TextInput;
use crate::core::models::atom::{Region, Serial, StateAtom};
use crate::core::models::pair::AtomPair;
use crate::core::models::term::{
    Angle, AngleParams, Bond, BondParams, Dihedral, Harmonic, Morse, Periodic, TorsionParams,
};
use phf::phf_map;
use std::io::{self, BufRead};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Atoms,
    Bonds,
    Constraints,
    SoftCore,
    SoftPairs,
    Angles,
    Torsions,
    Impropers,
}

impl Section {
    fn name(self) -> &'static str {
        match self {
            Section::Atoms => "atoms",
            Section::Bonds => "bonds",
            Section::Constraints => "bcon",
            Section::SoftCore => "soft-core",
            Section::SoftPairs => "soft-pairs",
            Section::Angles => "angles",
            Section::Torsions => "torsions",
            Section::Impropers => "impropers",
        }
    }
}

static SECTION_MARKERS: phf::Map<&'static str, Section> = phf_map! {
    "[atoms]" => Section::Atoms,
    "[bonds]" => Section::Bonds,
    "[bcon]" => Section::Constraints,
    "[soft-core]" => Section::SoftCore,
    "[soft-pairs]" => Section::SoftPairs,
    "[angles]" => Section::Angles,
    "[torsions]" => Section::Torsions,
    "[impropers]" => Section::Impropers,
};

#[derive(Debug, Error)]
pub enum DirectiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: DirectiveParseErrorKind,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum DirectiveParseErrorKind {
    #[error("Data row appears before any section marker")]
    RowOutsideSection,
    #[error("Unknown section marker '{0}'")]
    UnknownSection(String),
    #[error("Row in [{section}] needs {expected} tokens, found {found}")]
    TokenCount {
        section: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Invalid integer for {field} (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid float for {field} (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("Atom {0} is declared more than once")]
    DuplicateAtom(Serial),
}

/// One `[atoms]` row.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomDeclaration {
    pub line: usize,
    pub serial: Serial,
    pub reactant: StateAtom,
    pub product: StateAtom,
    pub dummy_type: Option<String>,
    pub region: Region,
}

/// Per-atom soft-core parameters from `[soft-core]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftCoreAtom {
    pub serial: Serial,
    pub prefactor: f64,
    pub beta: f64,
}

/// Explicit soft-core entry from `[soft-pairs]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftPairOverride {
    pub pair: AtomPair,
    pub beta_a: f64,
    pub prefactor_a: f64,
    pub beta_b: f64,
    pub prefactor_b: f64,
}

/// Parsed contents of a directive file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directive {
    pub atoms: Vec<AtomDeclaration>,
    pub bonds: Vec<Bond>,
    pub angles: Vec<Angle>,
    pub torsions: Vec<Dihedral>,
    pub impropers: Vec<Dihedral>,
    pub constraints: Vec<String>,
    pub soft_core: Vec<SoftCoreAtom>,
    pub soft_pairs: Vec<SoftPairOverride>,
}

pub struct DirectiveFile;

impl TextInput for DirectiveFile {
    type Output = Directive;
    type Error = DirectiveError;

    fn read_from(reader: &mut impl BufRead) -> Result<Directive, DirectiveError> {
        let mut directive = Directive::default();
        let mut section: Option<Section> = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let raw = line_res?;
            let line = line_num + 1;
            let content = strip_comment(&raw);
            let tokens: Vec<&str> = content.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }

            let joined: String = tokens.concat();
            if joined.starts_with('[') {
                match SECTION_MARKERS.get(joined.as_str()) {
                    Some(next) => section = Some(*next),
                    None => {
                        return Err(DirectiveError::Parse {
                            line,
                            kind: DirectiveParseErrorKind::UnknownSection(joined),
                        });
                    }
                }
                continue;
            }

            let current = section.ok_or(DirectiveError::Parse {
                line,
                kind: DirectiveParseErrorKind::RowOutsideSection,
            })?;
            let row = Row {
                line,
                section: current,
                tokens: &tokens,
            };
            parse_row(&mut directive, row, content.trim_end())
                .map_err(|kind| DirectiveError::Parse { line, kind })?;
        }

        Ok(directive)
    }
}

fn strip_comment(line: &str) -> &str {
    let cut = line.find(';').or_else(|| line.find('#'));
    match cut {
        Some(idx) => &line[..idx],
        None => line,
    }
}

struct Row<'a> {
    line: usize,
    section: Section,
    tokens: &'a [&'a str],
}

impl Row<'_> {
    fn require(&self, expected: usize) -> Result<(), DirectiveParseErrorKind> {
        if self.tokens.len() < expected {
            return Err(DirectiveParseErrorKind::TokenCount {
                section: self.section.name(),
                expected,
                found: self.tokens.len(),
            });
        }
        Ok(())
    }

    fn int<T: FromStr>(&self, idx: usize, field: &'static str) -> Result<T, DirectiveParseErrorKind> {
        let value = self.tokens[idx];
        value
            .parse()
            .map_err(|_| DirectiveParseErrorKind::InvalidInt {
                field,
                value: value.to_string(),
            })
    }

    fn float(&self, idx: usize, field: &'static str) -> Result<f64, DirectiveParseErrorKind> {
        let value = self.tokens[idx];
        value
            .parse()
            .map_err(|_| DirectiveParseErrorKind::InvalidFloat {
                field,
                value: value.to_string(),
            })
    }

    fn serials<const N: usize>(&self) -> Result<[Serial; N], DirectiveParseErrorKind> {
        let mut atoms = [0; N];
        for (idx, slot) in atoms.iter_mut().enumerate() {
            *slot = self.int(idx, "atom index")?;
        }
        Ok(atoms)
    }

    fn floats(&self, from: usize, count: usize, field: &'static str) -> Result<Vec<f64>, DirectiveParseErrorKind> {
        (from..from + count).map(|idx| self.float(idx, field)).collect()
    }

    fn raw_params(&self, from: usize) -> Vec<String> {
        self.tokens[from..].iter().map(|t| t.to_string()).collect()
    }
}

fn parse_row(directive: &mut Directive, row: Row<'_>, content: &str) -> Result<(), DirectiveParseErrorKind> {
    match row.section {
        Section::Atoms => {
            let atom = parse_atom(&row)?;
            if directive.atoms.iter().any(|a| a.serial == atom.serial) {
                return Err(DirectiveParseErrorKind::DuplicateAtom(atom.serial));
            }
            directive.atoms.push(atom);
        }
        Section::Bonds => directive.bonds.push(parse_bond(&row)?),
        Section::Angles => directive.angles.push(parse_angle(&row)?),
        Section::Torsions | Section::Impropers => {
            let dihedral = parse_dihedral(&row)?;
            if row.section == Section::Torsions {
                directive.torsions.push(dihedral);
            } else {
                directive.impropers.push(dihedral);
            }
        }
        Section::Constraints => directive.constraints.push(content.to_string()),
        Section::SoftCore => {
            row.require(3)?;
            directive.soft_core.push(SoftCoreAtom {
                serial: row.int(0, "atom index")?,
                prefactor: row.float(1, "pre-exponential factor")?,
                beta: row.float(2, "decay constant")?,
            });
        }
        Section::SoftPairs => {
            row.require(7)?;
            let [a, b] = row.serials::<2>()?;
            directive.soft_pairs.push(SoftPairOverride {
                pair: AtomPair::new(a, b),
                beta_a: row.float(3, "decay constant")?,
                prefactor_a: row.float(4, "pre-exponential factor")?,
                beta_b: row.float(5, "decay constant")?,
                prefactor_b: row.float(6, "pre-exponential factor")?,
            });
        }
    }
    Ok(())
}

fn parse_atom(row: &Row<'_>) -> Result<AtomDeclaration, DirectiveParseErrorKind> {
    row.require(6)?;
    let count = row.tokens.len();
    let region = Region::from_flag(row.int(count - 1, "region")?);
    if region.is_reacting() && count != 7 {
        return Err(DirectiveParseErrorKind::TokenCount {
            section: row.section.name(),
            expected: 7,
            found: count,
        });
    }
    let dummy_type = (count >= 7).then(|| row.tokens[5].to_string());

    Ok(AtomDeclaration {
        line: row.line,
        serial: row.int(0, "atom index")?,
        reactant: StateAtom {
            label: row.tokens[1].to_string(),
            charge: row.float(2, "reactant charge")?,
        },
        product: StateAtom {
            label: row.tokens[3].to_string(),
            charge: row.float(4, "product charge")?,
        },
        dummy_type,
        region,
    })
}

fn parse_bond(row: &Row<'_>) -> Result<Bond, DirectiveParseErrorKind> {
    row.require(3)?;
    let atoms = row.serials::<2>()?;
    let func: u32 = row.int(2, "function type")?;
    let params = match func {
        1 => {
            row.require(7)?;
            let p = row.floats(3, 4, "bond parameter")?;
            BondParams::Harmonic {
                a: Harmonic::new(p[0], p[1]),
                b: Harmonic::new(p[2], p[3]),
            }
        }
        3 => {
            row.require(9)?;
            let p = row.floats(3, 6, "bond parameter")?;
            BondParams::Morse {
                a: Morse {
                    b0: p[0],
                    depth: p[1],
                    beta: p[2],
                },
                b: Morse {
                    b0: p[3],
                    depth: p[4],
                    beta: p[5],
                },
            }
        }
        _ => BondParams::Raw {
            func,
            params: row.raw_params(3),
        },
    };
    Ok(Bond::from_directive(atoms, params))
}

fn parse_angle(row: &Row<'_>) -> Result<Angle, DirectiveParseErrorKind> {
    row.require(4)?;
    let atoms = row.serials::<3>()?;
    let func: u32 = row.int(3, "function type")?;
    let params = if func == 1 {
        row.require(8)?;
        let p = row.floats(4, 4, "angle parameter")?;
        AngleParams::Harmonic {
            a: Harmonic::new(p[0], p[1]),
            b: Harmonic::new(p[2], p[3]),
        }
    } else {
        AngleParams::Raw {
            func,
            params: row.raw_params(4),
        }
    };
    Ok(Angle::from_directive(atoms, params))
}

fn parse_dihedral(row: &Row<'_>) -> Result<Dihedral, DirectiveParseErrorKind> {
    row.require(5)?;
    let atoms = row.serials::<4>()?;
    let func: u32 = row.int(4, "function type")?;
    let params = match func {
        3 => {
            row.require(17)?;
            let p = row.floats(5, 12, "dihedral coefficient")?;
            let mut a = [0.0; 6];
            let mut b = [0.0; 6];
            a.copy_from_slice(&p[..6]);
            b.copy_from_slice(&p[6..]);
            TorsionParams::Ryckaert { a, b }
        }
        2 => {
            row.require(9)?;
            let p = row.floats(5, 4, "dihedral parameter")?;
            TorsionParams::Improper {
                a: Harmonic::new(p[0], p[1]),
                b: Harmonic::new(p[2], p[3]),
            }
        }
        1 | 4 | 9 => {
            row.require(10)?;
            TorsionParams::Periodic {
                func,
                a: Periodic {
                    phase: row.float(5, "dihedral phase")?,
                    k: row.float(6, "dihedral force constant")?,
                },
                multiplicity: row.int(7, "multiplicity")?,
                b: Periodic {
                    phase: row.float(8, "dihedral phase")?,
                    k: row.float(9, "dihedral force constant")?,
                },
            }
        }
        _ => TorsionParams::Raw {
            func,
            params: row.raw_params(5),
        },
    };
    Ok(Dihedral::from_directive(atoms, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::term::Origin;
    use std::io::Cursor;

    fn parse(content: &str) -> Result<Directive, DirectiveError> {
        DirectiveFile::read_from(&mut Cursor::new(content))
    }

    fn parse_error_kind(content: &str) -> (usize, DirectiveParseErrorKind) {
        match parse(content) {
            Err(DirectiveError::Parse { line, kind }) => (line, kind),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    const SAMPLE: &str = "\
; proton transfer between two waters
[ atoms ]
  1  OW  -0.834  OH  -1.300  DO  1
  2  HW   0.417  HO   0.300  DH  1
  3  CT  -0.180  CT  -0.180      2  # boundary carbon

[ bonds ]
  1  2  1  0.09572 502080.0 0.09572 0.0
  1  3  3  0.1 400.0 20.0 0.1 400.0 20.0
  1  3  5  foo bar

[ bcon ]
  1  2  5

[ soft-core ]
  1  1000.0  2.5
[soft-pairs]
  1  2  9  2.5  1000.0  2.5  1000.0

[ angles ]
  2  1  3  1  104.52 628.02 104.52 0.0

[ torsions ]
  1 2 3 4  3  1 2 3 4 5 6  0 0 0 0 0 0
[ impropers ]
  1 2 3 4  2  0.0 43.9 0.0 0.0
";

    #[test]
    fn read_from_parses_every_section() {
        let directive = parse(SAMPLE).unwrap();

        assert_eq!(directive.atoms.len(), 3);
        let first = &directive.atoms[0];
        assert_eq!(first.serial, 1);
        assert_eq!(first.line, 3);
        assert_eq!(first.reactant.label, "OW");
        assert_eq!(first.product.charge, -1.3);
        assert_eq!(first.dummy_type.as_deref(), Some("DO"));
        assert_eq!(first.region, Region::Reacting);

        let boundary = &directive.atoms[2];
        assert_eq!(boundary.region, Region::Boundary(2));
        assert_eq!(boundary.dummy_type, None);

        assert_eq!(directive.bonds.len(), 3);
        assert!(matches!(directive.bonds[0].params, BondParams::Harmonic { .. }));
        assert!(matches!(directive.bonds[1].params, BondParams::Morse { .. }));
        assert_eq!(
            directive.bonds[2].params,
            BondParams::Raw {
                func: 5,
                params: vec!["foo".to_string(), "bar".to_string()]
            }
        );
        assert!(directive.bonds.iter().all(|b| b.origin == Origin::Directive));

        assert_eq!(directive.constraints, vec!["  1  2  5".to_string()]);
        assert_eq!(directive.soft_core.len(), 1);
        assert_eq!(directive.soft_core[0].beta, 2.5);
        assert_eq!(directive.soft_pairs[0].pair, AtomPair::new(2, 1));
        assert_eq!(directive.angles[0].atoms, [2, 1, 3]);

        match &directive.torsions[0].params {
            TorsionParams::Ryckaert { a, b } => {
                assert_eq!(a, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
                assert_eq!(b, &[0.0; 6]);
            }
            other => panic!("unexpected torsion params {other:?}"),
        }
        assert!(matches!(
            directive.impropers[0].params,
            TorsionParams::Improper { .. }
        ));
    }

    #[test]
    fn read_from_accepts_markers_without_spaces() {
        let directive = parse("[atoms]\n1 A 0.0 B 0.0 D 1\n").unwrap();
        assert_eq!(directive.atoms.len(), 1);
    }

    #[test]
    fn read_from_rejects_rows_before_any_section() {
        let (line, kind) = parse_error_kind("\n1 A 0.0 B 0.0 D 1\n");
        assert_eq!(line, 2);
        assert_eq!(kind, DirectiveParseErrorKind::RowOutsideSection);
    }

    #[test]
    fn read_from_rejects_unknown_section() {
        let (_, kind) = parse_error_kind("[ residues ]\n");
        assert_eq!(kind, DirectiveParseErrorKind::UnknownSection("[residues]".into()));
    }

    #[test]
    fn reacting_atom_row_requires_dummy_type() {
        let (line, kind) = parse_error_kind("[ atoms ]\n1 A 0.0 B 0.0 1\n");
        assert_eq!(line, 2);
        assert!(matches!(
            kind,
            DirectiveParseErrorKind::TokenCount { expected: 7, found: 6, .. }
        ));
    }

    #[test]
    fn short_bond_override_reports_line_number() {
        let (line, kind) = parse_error_kind("[ atoms ]\n1 A 0.0 B 0.0 D 1\n[ bonds ]\n1 2 1 0.1 100.0\n");
        assert_eq!(line, 4);
        assert!(matches!(kind, DirectiveParseErrorKind::TokenCount { section: "bonds", .. }));
    }

    #[test]
    fn malformed_charge_is_reported_as_invalid_float() {
        let (_, kind) = parse_error_kind("[ atoms ]\n1 A abc B 0.0 D 1\n");
        assert!(matches!(kind, DirectiveParseErrorKind::InvalidFloat { .. }));
    }

    #[test]
    fn duplicate_atom_is_rejected() {
        let (line, kind) = parse_error_kind("[ atoms ]\n1 A 0.0 B 0.0 D 1\n1 C 0.0 D 0.0 D 1\n");
        assert_eq!(line, 3);
        assert_eq!(kind, DirectiveParseErrorKind::DuplicateAtom(1));
    }

    #[test]
    fn semicolon_comment_takes_precedence_over_hash() {
        assert_eq!(strip_comment("1 2 # a ; b"), "1 2 # a ");
        assert_eq!(strip_comment("1 2 # a"), "1 2 ");
    }
}
