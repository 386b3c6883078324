use super::index::AtomIndex;
use super::{TopologyError, TopologyWarning};
use crate::core::io::topfile::{EVB_MARKER, LineKind, classify};
use crate::core::models::atom::Serial;
use tracing::warn;

pub const REFERENCE_FILE_NAME: &str = "evbless.top";

/// Section of a window topology being rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Atoms,
    Bonds,
    SoftCore,
    Constraints,
    Angles,
    Dihedrals,
    Pairs,
    PairsNb,
}

impl Block {
    fn name(self) -> &'static str {
        match self {
            Block::Atoms => "atoms",
            Block::Bonds => "bonds",
            Block::SoftCore => "soft-core",
            Block::Constraints => "constraints",
            Block::Angles => "angles",
            Block::Dihedrals => "dihedrals",
            Block::Pairs => "pairs",
            Block::PairsNb => "pairs_nb",
        }
    }
}

/// Section switch triggered by `line`, if any. Inside the EVB block the soft-core and
/// constraint comments open their own blocks.
fn switch(line: &str, in_evb: bool) -> Option<Option<Block>> {
    let compact: String = line.split_whitespace().collect();
    if !in_evb {
        if compact.contains("[atoms]") {
            return Some(Some(Block::Atoms));
        }
        return matches!(classify(line), LineKind::Header(_)).then_some(None);
    }
    let block = if compact.contains("[bonds]") {
        Block::Bonds
    } else if line.contains("soft-core") {
        Block::SoftCore
    } else if line.contains("constraints") {
        Block::Constraints
    } else if compact.contains("[angles]") {
        Block::Angles
    } else if compact.contains("[dihedrals]") {
        Block::Dihedrals
    } else if compact.contains("[pairs]") {
        Block::Pairs
    } else if compact.contains("[pairs_nb]") {
        Block::PairsNb
    } else {
        return matches!(classify(line), LineKind::Header(_)).then_some(None);
    };
    Some(Some(block))
}

/// Derives the reference-state topology from a rendered window topology.
///
/// Reacting atoms take their dummy type and lose their charge, bonded terms of the EVB
/// block are switched off, and soft-core bonds, constraints and explicit pairs are
/// commented out. Exclusions are kept.
///
/// # Errors
///
/// Returns [`TopologyError::MissingDummyType`] for a reacting atom without a dummy type and
/// [`TopologyError::MalformedRow`] for rows too short to rewrite.
pub fn reference_topology(
    lines: &[String],
    index: &AtomIndex,
) -> Result<(Vec<String>, Vec<TopologyWarning>), TopologyError> {
    let mut out = vec![
        "; Reference-state topology for EVB simulation in GROMACS, generated by evbkit".to_string(),
        "; Reacting atoms carry dummy types and no bonded EVB terms".to_string(),
    ];
    let mut warnings = Vec::new();
    let mut block: Option<Block> = None;
    let mut in_evb = false;

    for (i, line) in lines.iter().enumerate() {
        let line_num = i + 1;
        if line.contains(EVB_MARKER) {
            in_evb = true;
            out.push(line.clone());
            continue;
        }
        if let Some(next) = switch(line, in_evb) {
            block = next;
            out.push(line.clone());
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            block = None;
            out.push(line.clone());
            continue;
        }
        if tokens[0].starts_with(';') {
            out.push(line.clone());
            continue;
        }

        let Some(current) = block else {
            out.push(line.clone());
            continue;
        };
        let row = Row {
            tokens: &tokens,
            block: current,
            line: line_num,
        };
        let rewritten = match current {
            Block::Atoms => row.atom(index)?,
            Block::Bonds => row.bond()?,
            Block::Angles => row.angle()?,
            Block::Dihedrals => row.dihedral()?,
            Block::SoftCore | Block::Constraints | Block::Pairs | Block::PairsNb => {
                Some(format!(";{line}"))
            }
        };
        match rewritten {
            Some(new_line) => out.push(new_line),
            None if current == Block::Atoms => out.push(line.clone()),
            None => {
                let warning = TopologyWarning::UnknownFunction {
                    section: current.name(),
                    line: line_num,
                    func: row.func().unwrap_or_default().to_string(),
                };
                warn!("{}", warning);
                warnings.push(warning);
                out.push(line.clone());
            }
        }
    }

    Ok((out, warnings))
}

struct Row<'a> {
    tokens: &'a [&'a str],
    block: Block,
    line: usize,
}

impl Row<'_> {
    fn require(&self, n: usize) -> Result<(), TopologyError> {
        if self.tokens.len() < n {
            return Err(TopologyError::MalformedRow {
                section: self.block.name(),
                line: self.line,
            });
        }
        Ok(())
    }

    fn func(&self) -> Option<&str> {
        let position = match self.block {
            Block::Bonds => 2,
            Block::Angles => 3,
            Block::Dihedrals => 4,
            _ => return None,
        };
        self.tokens.get(position).copied()
    }

    fn func_number(&self) -> Option<u32> {
        self.func().and_then(|f| f.parse().ok())
    }

    fn atom(&self, index: &AtomIndex) -> Result<Option<String>, TopologyError> {
        let t = self.tokens;
        let Some(record) = t[0]
            .parse::<Serial>()
            .ok()
            .and_then(|serial| index.atoms().by_serial(serial))
            .filter(|record| record.region.is_reacting())
        else {
            return Ok(None);
        };
        let dummy = record
            .dummy_type
            .as_deref()
            .ok_or(TopologyError::MissingDummyType(record.serial))?;
        self.require(8)?;
        Ok(Some(format!(
            "{:>6} {:>10} {:>6} {:>6} {:>6} {:>6}        0.0   {:>8}",
            t[0], dummy, t[2], t[3], t[4], t[5], t[7]
        )))
    }

    fn bond(&self) -> Result<Option<String>, TopologyError> {
        self.require(3)?;
        let t = self.tokens;
        Ok(match self.func_number() {
            Some(1) => {
                self.require(4)?;
                Some(format!("{:>6} {:>5}   1   {:>8}   0.0", t[0], t[1], t[3]))
            }
            Some(3) => {
                self.require(6)?;
                Some(format!(
                    "{:>6} {:>5}   3   {:>8}   0.0    {:>5}",
                    t[0], t[1], t[3], t[5]
                ))
            }
            _ => None,
        })
    }

    fn angle(&self) -> Result<Option<String>, TopologyError> {
        self.require(4)?;
        let t = self.tokens;
        Ok(match self.func_number() {
            Some(1) => {
                self.require(5)?;
                Some(format!("{:>6} {:>5} {:>5}   1   {:>8}   0.0", t[0], t[1], t[2], t[4]))
            }
            _ => None,
        })
    }

    fn dihedral(&self) -> Result<Option<String>, TopologyError> {
        self.require(5)?;
        let t = self.tokens;
        let atoms = format!("{:>6} {:>5} {:>5} {:>5}", t[0], t[1], t[2], t[3]);
        Ok(match self.func_number() {
            Some(3) => Some(format!(
                "{atoms}   3     0.0   0.0   0.0   0.0   0.0   0.0"
            )),
            Some(2) => {
                self.require(6)?;
                Some(format!("{atoms}   2   {:>8}     0.0", t[5]))
            }
            Some(1 | 4 | 9) => {
                self.require(8)?;
                Some(format!("{atoms} {:>2}   {:>8}     0.0   {:>3}", t[4], t[5], t[7]))
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::topology::parameters::tests::declaration;

    fn index() -> AtomIndex {
        let decls = vec![declaration(1, "A1", "B1", 1), declaration(2, "A2", "B2", 2)];
        AtomIndex::build(&decls, &["mol"], &["mol"]).unwrap()
    }

    fn window(evb: &[&str]) -> Vec<String> {
        let mut lines: Vec<String> = [
            "[ atoms ]",
            "      1        A1      1     MOL    C1      1   0.100000     12.011       B1  -0.100000     12.011",
            "      2        A2      1     MOL    C2      2   0.200000     12.011       A2   0.200000     12.011",
            "",
            "[ bonds ]",
            "  1  2  1",
            "",
            ";----------------------------------------",
            "; This section is dedicated to EVB atoms",
            ";----------------------------------------",
            "",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        lines.extend(evb.iter().map(|s| s.to_string()));
        lines
    }

    #[test]
    fn reacting_atoms_become_uncharged_dummies() {
        let (out, warnings) = reference_topology(&window(&[]), &index()).unwrap();
        assert_eq!(out[3], "     1        DU1      1    MOL     C1      1        0.0     12.011");
        assert!(out[4].starts_with("      2        A2"));
        assert_eq!(out[7], "  1  2  1");
        assert!(warnings.is_empty());
    }

    #[test]
    fn evb_bonded_terms_are_switched_off() {
        let evb = [
            "[ bonds ]",
            "; harmonic and Morse bonds",
            "     1     2    1          0.15        2000.0          0.15           0.0",
            "     1     3    3           0.1         400.0          20.0           0.1           0.0          20.0",
            "; soft-core potential",
            "     1     3    9    0          0.00    0       2500.00  ; beta = 3.50",
            "",
            "[ angles ]",
            "     1     2     3    1         109.5         300.0         109.5           0.0",
            "",
            "[ dihedrals ]",
            "     1     2     3     4  3        1.0        2.0        3.0        4.0        5.0        6.0        0.0        0.0        0.0        0.0        0.0        0.0",
            "     1     2     3     4  2       10.0       50.0       10.0        0.0",
            "     1     2     3     4  9      180.0       10.5          2      180.0        0.0",
            "",
            "[ exclusions ]",
            " 1   3",
            "",
            "[ pairs ]",
            " 1   4    1     0.300000    0.200000    1.000000    0.000000  ;4 -> 2/3",
            "",
            "[ pairs_nb ]",
            "     1     3  1    0.000000  1.00   1.00   0.00  ;2 -> 5",
        ];
        let (out, warnings) = reference_topology(&window(&evb), &index()).unwrap();
        let body = &out[out.len() - evb.len()..];

        assert_eq!(body[2], "     1     2   1       0.15   0.0");
        assert_eq!(body[3], "     1     3   3        0.1   0.0     20.0");
        assert!(body[5].starts_with(";     1     3    9"));
        assert_eq!(body[8], "     1     2     3   1      109.5   0.0");
        assert_eq!(
            body[11],
            "     1     2     3     4   3     0.0   0.0   0.0   0.0   0.0   0.0"
        );
        assert_eq!(body[12], "     1     2     3     4   2       10.0     0.0");
        assert_eq!(body[13], "     1     2     3     4  9      180.0     0.0     2");
        assert_eq!(body[16], " 1   3");
        assert!(body[19].starts_with("; 1   4"));
        assert!(body[22].starts_with(";     1     3  1"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn unknown_functions_are_kept_with_a_warning() {
        let evb = ["[ bonds ]", "     1     2    5", "", "[ angles ]", "  1  2  3  5  1.0 2.0"];
        let (out, warnings) = reference_topology(&window(&evb), &index()).unwrap();
        assert!(out.contains(&"     1     2    5".to_string()));
        assert_eq!(warnings.len(), 2);
        assert!(matches!(
            &warnings[0],
            TopologyWarning::UnknownFunction { section: "bonds", func, .. } if func == "5"
        ));
    }

    #[test]
    fn reacting_atom_without_dummy_type_is_an_error() {
        let mut decl = declaration(1, "A1", "B1", 1);
        decl.dummy_type = None;
        let index = AtomIndex::build(&[decl], &["mol"], &["mol"]).unwrap();
        let err = reference_topology(&window(&[]), &index).unwrap_err();
        assert!(matches!(err, TopologyError::MissingDummyType(1)));
    }

    #[test]
    fn short_evb_rows_are_malformed() {
        let evb = ["[ angles ]", "  1  2"];
        let err = reference_topology(&window(&evb), &index()).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::MalformedRow {
                section: "angles",
                ..
            }
        ));
    }
}
