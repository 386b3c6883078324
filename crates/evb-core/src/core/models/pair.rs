use super::atom::{Serial, State};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Unordered pair of atoms. Equality and hashing ignore orientation; the stored order is
/// kept for output.
#[derive(Debug, Clone, Copy)]
pub struct AtomPair {
    pub first: Serial,
    pub second: Serial,
}

impl AtomPair {
    pub fn new(first: Serial, second: Serial) -> Self {
        Self { first, second }
    }

    pub fn key(self) -> (Serial, Serial) {
        (self.first.min(self.second), self.first.max(self.second))
    }

    pub fn contains(self, serial: Serial) -> bool {
        self.first == serial || self.second == serial
    }

    /// The atom opposite `serial`, if `serial` belongs to the pair.
    pub fn partner(self, serial: Serial) -> Option<Serial> {
        if self.first == serial {
            Some(self.second)
        } else if self.second == serial {
            Some(self.first)
        } else {
            None
        }
    }

    /// The atom shared with `other`, if exactly one is shared.
    pub fn shared_atom(self, other: AtomPair) -> Option<Serial> {
        if self == other {
            return None;
        }
        [self.first, self.second]
            .into_iter()
            .find(|&serial| other.contains(serial))
    }
}

impl PartialEq for AtomPair {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for AtomPair {}

impl Hash for AtomPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl From<[Serial; 2]> for AtomPair {
    fn from(atoms: [Serial; 2]) -> Self {
        Self::new(atoms[0], atoms[1])
    }
}

/// Topological relationship of an atom pair within one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    /// 1-2, directly bonded.
    Bond = 2,
    /// 1-3, endpoints of an angle.
    Angle = 3,
    /// 1-4, endpoints of a torsion path.
    Pair = 4,
    /// Further apart; full non-bonded interaction.
    Nonbonded = 5,
}

impl Relation {
    pub fn digit(self) -> u8 {
        self as u8
    }
}

/// Reactant and product relationship of an atom pair, conventionally written as a two-digit
/// code such as `25` (bonded in RS, non-bonded in PS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairCode {
    pub reactant: Relation,
    pub product: Relation,
}

impl PairCode {
    pub const BOND_BREAKING: PairCode = PairCode::new(Relation::Bond, Relation::Nonbonded);
    pub const BOND_FORMING: PairCode = PairCode::new(Relation::Nonbonded, Relation::Bond);
    pub const ANGLE_BREAKING: PairCode = PairCode::new(Relation::Angle, Relation::Nonbonded);
    pub const ANGLE_FORMING: PairCode = PairCode::new(Relation::Nonbonded, Relation::Angle);
    pub const RESTORED: PairCode = PairCode::new(Relation::Nonbonded, Relation::Nonbonded);

    pub const fn new(reactant: Relation, product: Relation) -> Self {
        Self { reactant, product }
    }

    pub fn value(self) -> u8 {
        self.reactant.digit() * 10 + self.product.digit()
    }

    pub fn relation(self, state: State) -> Relation {
        match state {
            State::Reactant => self.reactant,
            State::Product => self.product,
        }
    }

    /// The state in which the pair is further apart. `None` when both relations agree.
    pub fn distant_state(self) -> Option<State> {
        match self.reactant.cmp(&self.product) {
            std::cmp::Ordering::Less => Some(State::Product),
            std::cmp::Ordering::Greater => Some(State::Reactant),
            std::cmp::Ordering::Equal => None,
        }
    }
}

impl fmt::Display for PairCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// A 1-4 pair that exists in exactly one state, tagged with its relation in the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassifiedPair {
    pub pair: AtomPair,
    pub code: PairCode,
}

impl ClassifiedPair {
    /// The state in which the pair is a genuine 1-4 pair.
    pub fn native_state(&self) -> State {
        if self.code.reactant == Relation::Pair {
            State::Reactant
        } else {
            State::Product
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn atom_pair_equality_ignores_orientation() {
        assert_eq!(AtomPair::new(3, 7), AtomPair::new(7, 3));
        let set: HashSet<_> = [AtomPair::new(3, 7), AtomPair::new(7, 3)].into();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn shared_atom_and_partner_are_found() {
        let a = AtomPair::new(1, 2);
        let b = AtomPair::new(2, 5);
        assert_eq!(a.shared_atom(b), Some(2));
        assert_eq!(a.partner(2), Some(1));
        assert_eq!(b.partner(9), None);
        assert_eq!(a.shared_atom(AtomPair::new(2, 1)), None);
        assert_eq!(a.shared_atom(AtomPair::new(3, 4)), None);
    }

    #[test]
    fn pair_code_values_match_conventional_notation() {
        assert_eq!(PairCode::BOND_BREAKING.value(), 25);
        assert_eq!(PairCode::ANGLE_FORMING.value(), 53);
        assert_eq!(
            PairCode::new(Relation::Pair, Relation::Angle).to_string(),
            "43"
        );
    }

    #[test]
    fn distant_state_points_at_the_looser_relation() {
        assert_eq!(PairCode::BOND_BREAKING.distant_state(), Some(State::Product));
        assert_eq!(PairCode::BOND_FORMING.distant_state(), Some(State::Reactant));
        assert_eq!(
            PairCode::new(Relation::Pair, Relation::Bond).distant_state(),
            Some(State::Reactant)
        );
        assert_eq!(PairCode::RESTORED.distant_state(), None);
    }

    #[test]
    fn native_state_is_where_the_pair_is_one_four() {
        let rs_only = ClassifiedPair {
            pair: AtomPair::new(1, 4),
            code: PairCode::new(Relation::Pair, Relation::Nonbonded),
        };
        let ps_only = ClassifiedPair {
            pair: AtomPair::new(1, 4),
            code: PairCode::new(Relation::Angle, Relation::Pair),
        };
        assert_eq!(rs_only.native_state(), State::Reactant);
        assert_eq!(ps_only.native_state(), State::Product);
    }
}
