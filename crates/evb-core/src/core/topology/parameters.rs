use super::index::AtomIndex;
use super::{TopologyError, TopologyWarning};
use crate::core::io::fragment::{FragmentKind, FragmentLibrary, FragmentRow};
use crate::core::models::atom::{Serial, State};
use crate::core::models::pair::AtomPair;
use crate::core::models::term::{Harmonic, Periodic};
use std::collections::HashMap;

/// Sum of region flags up to which a dihedral is still taken into the EVB block; allows one
/// boundary atom.
const DIHEDRAL_REGION_LIMIT: u32 = 5;

/// A bonded term of one state, resolved to atom serials.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTerm<const N: usize, V> {
    pub atoms: [Serial; N],
    pub value: V,
}

impl<const N: usize, V> StateTerm<N, V> {
    pub fn same_atom_set(&self, atoms: &[Serial; N]) -> bool {
        let mut own = self.atoms;
        let mut other = *atoms;
        own.sort_unstable();
        other.sort_unstable();
        own == other
    }

    pub fn same_path(&self, atoms: &[Serial; N]) -> bool {
        self.atoms == *atoms || self.atoms.iter().eq(atoms.iter().rev())
    }
}

/// Dihedral parameters of one state, in the layout of their function type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TorsionValues {
    Ryckaert([f64; 6]),
    Improper(Harmonic),
    Periodic {
        func: u32,
        term: Periodic,
        multiplicity: u32,
    },
}

impl TorsionValues {
    pub fn from_row(func: u32, values: &[f64]) -> Option<Self> {
        match func {
            3 if values.len() >= 6 => {
                let mut coefficients = [0.0; 6];
                coefficients.copy_from_slice(&values[..6]);
                Some(TorsionValues::Ryckaert(coefficients))
            }
            2 if values.len() >= 2 => Some(TorsionValues::Improper(Harmonic::new(
                values[0], values[1],
            ))),
            1 | 4 | 9 if values.len() >= 3 => Some(TorsionValues::Periodic {
                func,
                term: Periodic {
                    phase: values[0],
                    k: values[1],
                },
                multiplicity: values[2] as u32,
            }),
            _ => None,
        }
    }

    pub fn func(&self) -> u32 {
        match self {
            TorsionValues::Ryckaert(_) => 3,
            TorsionValues::Improper(_) => 2,
            TorsionValues::Periodic { func, .. } => *func,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LennardJones {
    pub sigma: f64,
    pub epsilon: f64,
}

impl LennardJones {
    /// Geometric-mean combination of two atoms.
    pub fn combine(self, other: LennardJones) -> LennardJones {
        LennardJones {
            sigma: (self.sigma * other.sigma).sqrt(),
            epsilon: (self.epsilon * other.epsilon).sqrt(),
        }
    }
}

/// Bonds and angles of one state between any declared atoms, boundary atoms included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connectivity {
    pub bonds: Vec<AtomPair>,
    pub angles: Vec<[Serial; 3]>,
}

impl Connectivity {
    pub fn is_bonded(&self, pair: AtomPair) -> bool {
        self.bonds.contains(&pair)
    }

    /// Whether the pair forms the two ends of an angle.
    pub fn spans_angle(&self, pair: AtomPair) -> bool {
        self.angles
            .iter()
            .any(|angle| AtomPair::new(angle[0], angle[2]) == pair)
    }

    /// Whether both atoms of the pair occur in one angle, in any position.
    pub fn shares_angle(&self, pair: AtomPair) -> bool {
        self.angles
            .iter()
            .any(|angle| angle.contains(&pair.first) && angle.contains(&pair.second))
    }

    fn add_bond(&mut self, pair: AtomPair) {
        if !self.bonds.contains(&pair) {
            self.bonds.push(pair);
        }
    }

    fn add_angle(&mut self, atoms: [Serial; 3]) {
        let reversed = [atoms[2], atoms[1], atoms[0]];
        if !self.angles.iter().any(|a| *a == atoms || *a == reversed) {
            self.angles.push(atoms);
        }
    }
}

/// Everything the fragment files of one state contribute.
#[derive(Debug, Clone, Default)]
pub struct StateParameters {
    /// Bonds between reacting atoms.
    pub bonds: Vec<StateTerm<2, Harmonic>>,
    /// Angles between reacting atoms.
    pub angles: Vec<StateTerm<3, Harmonic>>,
    pub torsions: Vec<StateTerm<4, TorsionValues>>,
    pub impropers: Vec<StateTerm<4, TorsionValues>>,
    pub connectivity: Connectivity,
    pub vdw: HashMap<Serial, LennardJones>,
}

impl StateParameters {
    pub fn lennard_jones(&self, serial: Serial, state: State) -> Result<LennardJones, TopologyError> {
        self.vdw
            .get(&serial)
            .copied()
            .ok_or(TopologyError::MissingVdw { serial, state })
    }
}

/// Resolves the fragment rows of one state's residues against the atom index.
///
/// Missing fragment categories and malformed rows are returned as warnings; the affected
/// category simply contributes fewer terms.
pub fn collect<S: AsRef<str>>(
    index: &AtomIndex,
    library: &FragmentLibrary,
    state: State,
    residues: &[S],
) -> (StateParameters, Vec<TopologyWarning>) {
    let mut params = StateParameters::default();
    let mut warnings = Vec::new();

    for kind in FragmentKind::ALL {
        warnings.extend(
            library
                .missing(residues, kind)
                .into_iter()
                .map(|residue| TopologyWarning::MissingFragment {
                    residue: residue.to_string(),
                    kind,
                }),
        );

        for fragment in library.select(residues, kind) {
            let file = fragment.file_name().to_string();
            warnings.extend(fragment.skipped.iter().map(|row| TopologyWarning::SkippedRow {
                file: file.clone(),
                line: row.line,
                reason: row.reason.clone(),
            }));

            for row in &fragment.rows {
                let outcome = match kind {
                    FragmentKind::Bonds => collect_bond(&mut params, index, state, row),
                    FragmentKind::Angles => collect_angle(&mut params, index, state, row),
                    FragmentKind::Torsions | FragmentKind::Impropers => {
                        let target = if kind == FragmentKind::Torsions {
                            &mut params.torsions
                        } else {
                            &mut params.impropers
                        };
                        collect_dihedral(target, index, state, row)
                    }
                    FragmentKind::Vdw => collect_vdw(&mut params, index, state, row),
                };
                if let Err(reason) = outcome {
                    warnings.push(TopologyWarning::SkippedRow {
                        file: file.clone(),
                        line: row.line,
                        reason,
                    });
                }
            }
        }
    }

    (params, warnings)
}

fn labels<const N: usize>(row: &FragmentRow) -> Result<[&str; N], String> {
    let refs = row.label_refs();
    <[&str; N]>::try_from(refs.as_slice())
        .map_err(|_| format!("expected {N} labels, found {}", refs.len()))
}

fn harmonic(row: &FragmentRow) -> Result<Harmonic, String> {
    match row.values.as_slice() {
        [eq, k, ..] => Ok(Harmonic::new(*eq, *k)),
        _ => Err("missing equilibrium value or force constant".to_string()),
    }
}

fn collect_bond(
    params: &mut StateParameters,
    index: &AtomIndex,
    state: State,
    row: &FragmentRow,
) -> Result<(), String> {
    let labels = labels::<2>(row)?;
    let value = harmonic(row)?;
    for atoms in index.resolve(state, &labels) {
        params.connectivity.add_bond(AtomPair::from(atoms));
        if index.all_reacting(&atoms) && !params.bonds.iter().any(|b| b.same_atom_set(&atoms)) {
            params.bonds.push(StateTerm { atoms, value });
        }
    }
    Ok(())
}

fn collect_angle(
    params: &mut StateParameters,
    index: &AtomIndex,
    state: State,
    row: &FragmentRow,
) -> Result<(), String> {
    let labels = labels::<3>(row)?;
    let value = harmonic(row)?;
    for atoms in index.resolve(state, &labels) {
        params.connectivity.add_angle(atoms);
        if index.all_reacting(&atoms) && !params.angles.iter().any(|a| a.same_path(&atoms)) {
            params.angles.push(StateTerm { atoms, value });
        }
    }
    Ok(())
}

fn collect_dihedral(
    target: &mut Vec<StateTerm<4, TorsionValues>>,
    index: &AtomIndex,
    state: State,
    row: &FragmentRow,
) -> Result<(), String> {
    let labels = labels::<4>(row)?;
    let func = row.func.unwrap_or_default();
    let value = TorsionValues::from_row(func, &row.values)
        .ok_or_else(|| format!("unsupported dihedral function {func} or too few coefficients"))?;
    for atoms in index.resolve(state, &labels) {
        if index.region_sum(&atoms) <= DIHEDRAL_REGION_LIMIT
            && !target.iter().any(|t| t.same_path(&atoms))
        {
            target.push(StateTerm { atoms, value });
        }
    }
    Ok(())
}

fn collect_vdw(
    params: &mut StateParameters,
    index: &AtomIndex,
    state: State,
    row: &FragmentRow,
) -> Result<(), String> {
    let labels = labels::<1>(row)?;
    let [sigma, epsilon] = row.values.as_slice() else {
        return Err("expected sigma and epsilon".to_string());
    };
    for [serial] in index.resolve(state, &labels) {
        params.vdw.entry(serial).or_insert(LennardJones {
            sigma: *sigma,
            epsilon: *epsilon,
        });
    }
    Ok(())
}
