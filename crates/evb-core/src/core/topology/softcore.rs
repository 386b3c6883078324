use super::transitions::Transitions;
use crate::core::io::directive::{SoftCoreAtom, SoftPairOverride};
use crate::core::models::atom::{Serial, State};
use crate::core::models::pair::AtomPair;
use std::collections::HashMap;
use tracing::debug;

/// Tabulated potential function used for soft-core bonds.
pub const SOFT_CORE_FUNC: u32 = 9;

/// Distinct decay constants of the system, each backed by one tabulated potential.
///
/// Constants are compared with exact floating-point equality; an equal constant always
/// maps to the index it was first given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecayRegistry {
    betas: Vec<f64>,
}

impl DecayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table index of `beta`, registering it if it has not been seen.
    pub fn get_or_insert(&mut self, beta: f64) -> usize {
        match self.betas.iter().position(|&b| b == beta) {
            Some(index) => index,
            None => {
                self.betas.push(beta);
                self.betas.len() - 1
            }
        }
    }

    pub fn betas(&self) -> &[f64] {
        &self.betas
    }

    pub fn len(&self) -> usize {
        self.betas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.betas.is_empty()
    }
}

/// One exponential repulsion between two atoms, written as a tabulated bond.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftCoreEntry {
    pub pair: AtomPair,
    pub table: usize,
    /// Pre-exponential factor in state A and state B.
    pub prefactor: [f64; 2],
    pub beta: f64,
}

impl SoftCoreEntry {
    pub fn prefactor(&self, state: State) -> f64 {
        self.prefactor[state.index()]
    }

    /// Row of the `[ bonds ]` section.
    pub fn row(&self) -> String {
        format!(
            " {:>5} {:>5}    {}    {}  {:12.2}    {}  {:12.2}  ; beta = {:.2}",
            self.pair.first,
            self.pair.second,
            SOFT_CORE_FUNC,
            self.table,
            self.prefactor[0],
            self.table,
            self.prefactor[1],
            self.beta
        )
    }
}

/// Soft-core entries of the system and the registry of their decay constants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoftCore {
    pub entries: Vec<SoftCoreEntry>,
    pub registry: DecayRegistry,
}

/// Assigns soft-core repulsions to every forming and breaking term and every
/// donor-acceptor pair.
///
/// Explicit pair overrides come first and suppress any generated entry for their pair.
/// Generated entries need per-atom parameters for both atoms; the prefactor is the product
/// and the decay constant the geometric mean of the atomic values.
pub fn assign(
    transitions: &Transitions,
    atoms: &[SoftCoreAtom],
    overrides: &[SoftPairOverride],
    registry: &mut DecayRegistry,
) -> Vec<SoftCoreEntry> {
    let params: HashMap<Serial, &SoftCoreAtom> = atoms.iter().map(|a| (a.serial, a)).collect();
    let mut entries = Vec::new();

    for o in overrides {
        if o.beta_a == o.beta_b {
            let table = registry.get_or_insert(o.beta_a);
            entries.push(SoftCoreEntry {
                pair: o.pair,
                table,
                prefactor: [o.prefactor_a, o.prefactor_b],
                beta: o.beta_a,
            });
            continue;
        }
        // A tabulated bond carries a single table for both states, so each side gets
        // its own entry.
        if o.prefactor_a != 0.0 {
            let table = registry.get_or_insert(o.beta_a);
            entries.push(SoftCoreEntry {
                pair: o.pair,
                table,
                prefactor: [o.prefactor_a, 0.0],
                beta: o.beta_a,
            });
        }
        if o.prefactor_b != 0.0 {
            let table = registry.get_or_insert(o.beta_b);
            entries.push(SoftCoreEntry {
                pair: o.pair,
                table,
                prefactor: [0.0, o.prefactor_b],
                beta: o.beta_b,
            });
        }
    }

    let overridden = |pair: AtomPair| overrides.iter().any(|o| o.pair == pair);
    let mut generate = |pair: AtomPair, sides: [bool; 2], registry: &mut DecayRegistry| {
        if overridden(pair) {
            return;
        }
        let (Some(p1), Some(p2)) = (params.get(&pair.first), params.get(&pair.second)) else {
            debug!(a = pair.first, b = pair.second, "No soft-core parameters for pair");
            return;
        };
        let prefactor = p1.prefactor * p2.prefactor;
        let beta = (p1.beta * p2.beta).sqrt();
        let table = registry.get_or_insert(beta);
        entries.push(SoftCoreEntry {
            pair,
            table,
            prefactor: [
                if sides[0] { prefactor } else { 0.0 },
                if sides[1] { prefactor } else { 0.0 },
            ],
            beta,
        });
    };

    let sides_for = |state: Option<State>| match state {
        Some(State::Product) => [false, true],
        Some(State::Reactant) => [true, false],
        None => [true, true],
    };

    for bond in &transitions.bonds {
        generate(bond.pair, sides_for(bond.code.distant_state()), registry);
    }
    for angle in &transitions.angles {
        generate(angle.ends(), sides_for(angle.code.distant_state()), registry);
    }
    for &pair in &transitions.donor_acceptor {
        generate(pair, [true, true], registry);
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::pair::PairCode;
    use crate::core::topology::transitions::{SoloAngle, SoloBond};

    fn atom(serial: Serial, prefactor: f64, beta: f64) -> SoftCoreAtom {
        SoftCoreAtom {
            serial,
            prefactor,
            beta,
        }
    }

    fn proton_transfer() -> Transitions {
        Transitions {
            bonds: vec![
                SoloBond {
                    pair: AtomPair::new(1, 2),
                    code: PairCode::BOND_BREAKING,
                },
                SoloBond {
                    pair: AtomPair::new(2, 3),
                    code: PairCode::BOND_FORMING,
                },
            ],
            angles: vec![],
            donor_acceptor: vec![AtomPair::new(1, 3)],
            restored: vec![AtomPair::new(1, 3)],
        }
    }

    #[test]
    fn registry_reuses_index_for_equal_constants() {
        let mut registry = DecayRegistry::new();
        assert_eq!(registry.get_or_insert(2.5), 0);
        assert_eq!(registry.get_or_insert(3.0), 1);
        assert_eq!(registry.get_or_insert(2.5), 0);
        assert_eq!(registry.betas(), &[2.5, 3.0]);
    }

    #[test]
    fn distinct_pairs_with_equal_constants_share_a_table() {
        let atoms = [
            atom(1, 10.0, 4.0),
            atom(2, 2.0, 4.0),
            atom(3, 5.0, 4.0),
        ];
        let mut registry = DecayRegistry::new();
        let entries = assign(&proton_transfer(), &atoms, &[], &mut registry);

        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.table == 0));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.betas(), &[4.0]);
    }

    #[test]
    fn generated_entries_take_the_side_of_the_vacated_state() {
        let atoms = [atom(1, 10.0, 4.0), atom(2, 2.0, 9.0), atom(3, 5.0, 1.0)];
        let mut registry = DecayRegistry::new();
        let entries = assign(&proton_transfer(), &atoms, &[], &mut registry);

        let breaking = entries[0];
        assert_eq!(breaking.pair, AtomPair::new(1, 2));
        assert_eq!(breaking.prefactor, [0.0, 20.0]);
        assert_eq!(breaking.beta, 6.0);

        let forming = entries[1];
        assert_eq!(forming.prefactor, [10.0, 0.0]);
        assert_eq!(forming.beta, 3.0);

        let donor_acceptor = entries[2];
        assert_eq!(donor_acceptor.pair, AtomPair::new(1, 3));
        assert_eq!(donor_acceptor.prefactor, [50.0, 50.0]);
        assert_eq!(donor_acceptor.beta, 2.0);
        assert_eq!(registry.betas(), &[6.0, 3.0, 2.0]);
    }

    #[test]
    fn angle_entries_use_the_end_atoms() {
        let transitions = Transitions {
            angles: vec![SoloAngle {
                atoms: [4, 5, 6],
                code: PairCode::ANGLE_FORMING,
            }],
            ..Default::default()
        };
        let atoms = [atom(4, 1.0, 1.0), atom(6, 3.0, 1.0)];
        let entries = assign(&transitions, &atoms, &[], &mut DecayRegistry::new());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pair, AtomPair::new(4, 6));
        assert_eq!(entries[0].prefactor, [3.0, 0.0]);
    }

    #[test]
    fn pairs_without_atomic_parameters_are_skipped() {
        let atoms = [atom(1, 10.0, 4.0), atom(2, 2.0, 4.0)];
        let entries = assign(&proton_transfer(), &atoms, &[], &mut DecayRegistry::new());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pair, AtomPair::new(1, 2));
    }

    #[test]
    fn override_replaces_generated_entry() {
        let atoms = [atom(1, 10.0, 4.0), atom(2, 2.0, 4.0), atom(3, 5.0, 4.0)];
        let overrides = [SoftPairOverride {
            pair: AtomPair::new(3, 1),
            beta_a: 2.0,
            prefactor_a: 7.0,
            beta_b: 2.0,
            prefactor_b: 8.0,
        }];
        let mut registry = DecayRegistry::new();
        let entries = assign(&proton_transfer(), &atoms, &overrides, &mut registry);

        let for_pair: Vec<_> = entries
            .iter()
            .filter(|e| e.pair == AtomPair::new(1, 3))
            .collect();
        assert_eq!(for_pair.len(), 1);
        assert_eq!(for_pair[0].prefactor, [7.0, 8.0]);
        assert_eq!(registry.betas()[0], 2.0);
    }

    #[test]
    fn asymmetric_override_emits_one_entry_per_non_zero_side() {
        let overrides = [SoftPairOverride {
            pair: AtomPair::new(1, 3),
            beta_a: 2.0,
            prefactor_a: 7.0,
            beta_b: 3.0,
            prefactor_b: 8.0,
        }];
        let entries = assign(
            &Transitions::default(),
            &[],
            &overrides,
            &mut DecayRegistry::new(),
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].prefactor, [7.0, 0.0]);
        assert_eq!(entries[0].table, 0);
        assert_eq!(entries[1].prefactor, [0.0, 8.0]);
        assert_eq!(entries[1].table, 1);

        let one_sided = [SoftPairOverride {
            prefactor_a: 0.0,
            ..overrides[0]
        }];
        let entries = assign(
            &Transitions::default(),
            &[],
            &one_sided,
            &mut DecayRegistry::new(),
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].beta, 3.0);
    }

    #[test]
    fn soft_core_row_layout() {
        let entry = SoftCoreEntry {
            pair: AtomPair::new(12, 7),
            table: 1,
            prefactor: [0.0, 2500.0],
            beta: 3.5,
        };
        assert_eq!(
            entry.row(),
            "    12     7    9    1          0.00    1       2500.00  ; beta = 3.50"
        );
    }
}
