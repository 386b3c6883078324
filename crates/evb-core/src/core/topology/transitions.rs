use super::reconcile::MergedTerms;
use crate::core::models::atom::Serial;
use crate::core::models::pair::{AtomPair, ClassifiedPair, PairCode};
use crate::core::models::term::{Angle, Bond, Transition};

/// A forming or breaking bond (codes 25 and 52).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoloBond {
    pub pair: AtomPair,
    pub code: PairCode,
}

/// A forming or breaking angle (codes 35 and 53).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoloAngle {
    pub atoms: [Serial; 3],
    pub code: PairCode,
}

impl SoloAngle {
    pub fn ends(&self) -> AtomPair {
        AtomPair::new(self.atoms[0], self.atoms[2])
    }
}

/// Terms and pairs whose non-bonded treatment changes across the reaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transitions {
    /// Forming and breaking bonds that leave a full non-bonded interaction behind.
    pub bonds: Vec<SoloBond>,
    /// Forming and breaking angles that leave a full non-bonded interaction behind.
    pub angles: Vec<SoloAngle>,
    /// Outer atoms of a breaking and a forming bond that share an atom.
    pub donor_acceptor: Vec<AtomPair>,
    /// Pairs whose exclusion is lost across a forming/breaking boundary (code 55).
    pub restored: Vec<AtomPair>,
}

impl Transitions {
    pub fn derive(merged: &MergedTerms, pairs: &[ClassifiedPair]) -> Self {
        let forming_breaking = forming_breaking_bonds(&merged.bonds);
        let mut bonds = forming_breaking.clone();
        let mut angles = forming_breaking_angles(&merged.angles);

        // Terms already represented by a 1-4 pair are handled through that pair.
        for classified in pairs {
            if let Some(i) = bonds.iter().position(|b| b.pair == classified.pair) {
                bonds.remove(i);
            }
            if let Some(i) = angles.iter().position(|a| a.ends() == classified.pair) {
                angles.remove(i);
            }
        }

        bonds.retain(|bond| !spanned_by_active_angle(bond, &merged.angles));
        angles.retain(|angle| !closed_by_active_bond(angle, &merged.bonds));

        let donor_acceptor = donor_acceptor_pairs(&forming_breaking);
        let restored = restored_pairs(&bonds, &angles);

        Self {
            bonds,
            angles,
            donor_acceptor,
            restored,
        }
    }

    pub fn is_donor_acceptor(&self, pair: AtomPair) -> bool {
        self.donor_acceptor.contains(&pair)
    }
}

fn transition_code(transition: Transition, breaking: PairCode, forming: PairCode) -> Option<PairCode> {
    match transition {
        Transition::Shared => None,
        Transition::Breaking => Some(breaking),
        Transition::Forming => Some(forming),
    }
}

pub fn forming_breaking_bonds(bonds: &[Bond]) -> Vec<SoloBond> {
    bonds
        .iter()
        .filter_map(|bond| {
            transition_code(bond.transition, PairCode::BOND_BREAKING, PairCode::BOND_FORMING)
                .map(|code| SoloBond {
                    pair: AtomPair::from(bond.atoms),
                    code,
                })
        })
        .collect()
}

pub fn forming_breaking_angles(angles: &[Angle]) -> Vec<SoloAngle> {
    angles
        .iter()
        .filter_map(|angle| {
            transition_code(angle.transition, PairCode::ANGLE_BREAKING, PairCode::ANGLE_FORMING)
                .map(|code| SoloAngle {
                    atoms: angle.atoms,
                    code,
                })
        })
        .collect()
}

/// A breaking bond whose atoms are the ends of an angle active in the product is a 2-3
/// transition, not 2-5; symmetrically for forming bonds and the reactant.
fn spanned_by_active_angle(bond: &SoloBond, angles: &[Angle]) -> bool {
    let Some(state) = bond.code.distant_state() else {
        return false;
    };
    angles
        .iter()
        .any(|angle| AtomPair::from(angle.ends()) == bond.pair && angle.is_active(state))
}

/// A breaking angle whose ends are bonded in the product is a 3-2 transition, not 3-5;
/// symmetrically for forming angles. Only harmonic and Morse bonds are considered.
fn closed_by_active_bond(angle: &SoloAngle, bonds: &[Bond]) -> bool {
    let Some(state) = angle.code.distant_state() else {
        return false;
    };
    let ends = angle.ends();
    bonds.iter().any(|bond| {
        AtomPair::from(bond.atoms) == ends
            && bond.params.strength(state).is_some_and(|k| k != 0.0)
    })
}

/// Outer atoms of every breaking/forming bond couple that shares one atom.
pub fn donor_acceptor_pairs(bonds: &[SoloBond]) -> Vec<AtomPair> {
    let mut pairs = Vec::new();
    for (i, first) in bonds.iter().enumerate() {
        for second in &bonds[i + 1..] {
            if first.code == second.code {
                continue;
            }
            if let Some(pair) = outer_atoms(first.pair, second.pair) {
                if !pairs.contains(&pair) {
                    pairs.push(pair);
                }
            }
        }
    }
    pairs
}

fn outer_atoms(first: AtomPair, second: AtomPair) -> Option<AtomPair> {
    let shared = first.shared_atom(second)?;
    Some(AtomPair::new(first.partner(shared)?, second.partner(shared)?))
}

/// Pairs two or three bonds apart across a forming/breaking boundary.
///
/// The engine excludes them in both states because the bond exists, with a zero force
/// constant, in the state where it is absent; their non-bonded interaction is re-added.
pub fn restored_pairs(bonds: &[SoloBond], angles: &[SoloAngle]) -> Vec<AtomPair> {
    let mut restored: Vec<AtomPair> = Vec::new();
    let mut push = |pair: AtomPair| {
        if !restored.contains(&pair) {
            restored.push(pair);
        }
    };

    for (i, first) in bonds.iter().enumerate() {
        for second in &bonds[i + 1..] {
            if first.code != second.code {
                if let Some(pair) = outer_atoms(first.pair, second.pair) {
                    push(pair);
                }
            }
        }
    }

    for bond in bonds {
        let (b1, b2) = (bond.pair.first, bond.pair.second);
        for angle in angles {
            let crossing = (bond.code == PairCode::BOND_BREAKING && angle.code == PairCode::ANGLE_FORMING)
                || (bond.code == PairCode::BOND_FORMING && angle.code == PairCode::ANGLE_BREAKING);
            if !crossing {
                continue;
            }
            let [a1, _, a3] = angle.atoms;
            let pair = if b1 == a1 {
                Some((b2, a3))
            } else if b2 == a1 {
                Some((b1, a3))
            } else if b1 == a3 {
                Some((b2, a1))
            } else if b2 == a3 {
                Some((b1, a1))
            } else {
                None
            };
            if let Some((x, y)) = pair {
                push(AtomPair::new(x, y));
            }
        }
    }

    restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::pair::Relation;
    use crate::core::models::term::{AngleParams, BondParams, Harmonic};

    fn bond(atoms: [Serial; 2], ka: f64, kb: f64, transition: Transition) -> Bond {
        Bond::derived(
            atoms,
            BondParams::Harmonic {
                a: Harmonic::new(0.1, ka),
                b: Harmonic::new(0.1, kb),
            },
            transition,
        )
    }

    fn angle(atoms: [Serial; 3], ka: f64, kb: f64, transition: Transition) -> Angle {
        Angle::derived(
            atoms,
            AngleParams::Harmonic {
                a: Harmonic::new(109.5, ka),
                b: Harmonic::new(109.5, kb),
            },
            transition,
        )
    }

    fn proton_transfer() -> MergedTerms {
        MergedTerms {
            bonds: vec![
                bond([1, 2], 300.0, 0.0, Transition::Breaking),
                bond([2, 3], 0.0, 300.0, Transition::Forming),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn proton_transfer_yields_donor_acceptor_and_restored_pair() {
        let t = Transitions::derive(&proton_transfer(), &[]);
        assert_eq!(t.bonds.len(), 2);
        assert_eq!(t.bonds[0].code, PairCode::BOND_BREAKING);
        assert_eq!(t.bonds[1].code, PairCode::BOND_FORMING);
        assert_eq!(t.donor_acceptor, vec![AtomPair::new(1, 3)]);
        assert_eq!(t.restored, vec![AtomPair::new(1, 3)]);
        assert!(t.is_donor_acceptor(AtomPair::new(3, 1)));
    }

    #[test]
    fn bonds_represented_by_one_four_pairs_leave_the_solo_list() {
        let merged = proton_transfer();
        let pair = ClassifiedPair {
            pair: AtomPair::new(2, 3),
            code: PairCode::new(Relation::Nonbonded, Relation::Pair),
        };
        let t = Transitions::derive(&merged, &[pair]);
        assert_eq!(t.bonds.len(), 1);
        assert_eq!(t.bonds[0].pair, AtomPair::new(1, 2));
        // Donor-acceptor pairs come from the unfiltered bond list.
        assert_eq!(t.donor_acceptor, vec![AtomPair::new(1, 3)]);
        assert!(t.restored.is_empty());
    }

    #[test]
    fn breaking_bond_spanned_by_product_angle_is_not_solo() {
        let merged = MergedTerms {
            bonds: vec![bond([1, 3], 300.0, 0.0, Transition::Breaking)],
            angles: vec![angle([1, 2, 3], 0.0, 250.0, Transition::Forming)],
            ..Default::default()
        };
        let t = Transitions::derive(&merged, &[]);
        assert!(t.bonds.is_empty());
        assert_eq!(t.angles.len(), 1);
    }

    #[test]
    fn breaking_angle_closed_by_product_bond_is_not_solo() {
        let merged = MergedTerms {
            bonds: vec![bond([1, 3], 0.0, 300.0, Transition::Forming)],
            angles: vec![angle([1, 2, 3], 250.0, 0.0, Transition::Breaking)],
            ..Default::default()
        };
        let t = Transitions::derive(&merged, &[]);
        assert!(t.angles.is_empty());
    }

    #[test]
    fn breaking_bond_next_to_forming_angle_restores_outer_pair() {
        let bonds = vec![SoloBond {
            pair: AtomPair::new(1, 2),
            code: PairCode::BOND_BREAKING,
        }];
        let angles = vec![SoloAngle {
            atoms: [2, 4, 5],
            code: PairCode::ANGLE_FORMING,
        }];
        assert_eq!(restored_pairs(&bonds, &angles), vec![AtomPair::new(1, 5)]);
    }

    #[test]
    fn same_direction_terms_restore_nothing() {
        let bonds = vec![
            SoloBond {
                pair: AtomPair::new(1, 2),
                code: PairCode::BOND_BREAKING,
            },
            SoloBond {
                pair: AtomPair::new(2, 3),
                code: PairCode::BOND_BREAKING,
            },
        ];
        let angles = vec![SoloAngle {
            atoms: [2, 4, 5],
            code: PairCode::ANGLE_BREAKING,
        }];
        assert!(restored_pairs(&bonds, &angles).is_empty());
        assert!(donor_acceptor_pairs(&bonds).is_empty());
    }
}
