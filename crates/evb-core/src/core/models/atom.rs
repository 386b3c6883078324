use super::ids::AtomId;
use slotmap::SlotMap;
use std::collections::HashMap;
use std::fmt;

/// Atom number as it appears in the base topology.
pub type Serial = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum State {
    Reactant,
    Product,
}

impl State {
    pub const BOTH: [State; 2] = [State::Reactant, State::Product];

    pub fn other(self) -> Self {
        match self {
            State::Reactant => State::Product,
            State::Product => State::Reactant,
        }
    }

    pub fn index(self) -> usize {
        match self {
            State::Reactant => 0,
            State::Product => 1,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Reactant => write!(f, "RS"),
            State::Product => write!(f, "PS"),
        }
    }
}

/// Which part of the system an atom belongs to.
///
/// Only reacting atoms contribute bonded terms to the EVB block; boundary atoms (flag values
/// other than 1) are still considered when deriving 1-4 pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Reacting,
    Boundary(u8),
}

impl Region {
    pub fn from_flag(flag: u8) -> Self {
        if flag == 1 {
            Region::Reacting
        } else {
            Region::Boundary(flag)
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            Region::Reacting => 1,
            Region::Boundary(flag) => flag,
        }
    }

    pub fn is_reacting(self) -> bool {
        matches!(self, Region::Reacting)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateAtom {
    pub label: String,
    pub charge: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    pub serial: Serial,
    pub reactant: StateAtom,
    pub product: StateAtom,
    /// Non-interacting atom type used by the reference-state topology.
    pub dummy_type: Option<String>,
    pub region: Region,
}

impl AtomRecord {
    pub fn state(&self, state: State) -> &StateAtom {
        match state {
            State::Reactant => &self.reactant,
            State::Product => &self.product,
        }
    }

    pub fn charge(&self, state: State) -> f64 {
        self.state(state).charge
    }
}

/// Arena of declared atoms, addressable by key or by serial, iterated in declaration order.
#[derive(Debug, Clone, Default)]
pub struct AtomTable {
    atoms: SlotMap<AtomId, AtomRecord>,
    serial_to_id: HashMap<Serial, AtomId>,
    order: Vec<AtomId>,
}

impl AtomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, returning `None` if its serial is already present.
    pub fn insert(&mut self, record: AtomRecord) -> Option<AtomId> {
        if self.serial_to_id.contains_key(&record.serial) {
            return None;
        }
        let serial = record.serial;
        let id = self.atoms.insert(record);
        self.serial_to_id.insert(serial, id);
        self.order.push(id);
        Some(id)
    }

    pub fn get(&self, id: AtomId) -> Option<&AtomRecord> {
        self.atoms.get(id)
    }

    pub fn id_of(&self, serial: Serial) -> Option<AtomId> {
        self.serial_to_id.get(&serial).copied()
    }

    pub fn by_serial(&self, serial: Serial) -> Option<&AtomRecord> {
        self.id_of(serial).and_then(|id| self.atoms.get(id))
    }

    pub fn serial_of(&self, id: AtomId) -> Option<Serial> {
        self.atoms.get(id).map(|atom| atom.serial)
    }

    pub fn is_reacting(&self, serial: Serial) -> bool {
        self.by_serial(serial)
            .is_some_and(|atom| atom.region.is_reacting())
    }

    pub fn iter(&self) -> impl Iterator<Item = (AtomId, &AtomRecord)> {
        self.order
            .iter()
            .filter_map(move |&id| self.atoms.get(id).map(|atom| (id, atom)))
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

/// Label-to-atom scopes for one state.
///
/// A residue that occurs several times contributes the same labels several times; every
/// occurrence is placed in its own scope so that bonded terms read from a residue fragment
/// resolve within a single residue copy.
#[derive(Debug, Clone)]
pub struct LabelScopes {
    scopes: Vec<HashMap<String, AtomId>>,
}

impl LabelScopes {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scopes: vec![HashMap::new(); capacity.max(1)],
        }
    }

    /// Sizes the scopes after the most frequent residue name in the state.
    pub fn for_residues<S: AsRef<str>>(residues: &[S]) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for residue in residues {
            *counts.entry(residue.as_ref()).or_default() += 1;
        }
        Self::with_capacity(counts.values().copied().max().unwrap_or(1))
    }

    /// Places `label` in the first scope where it is still free and returns that scope index.
    pub fn assign(&mut self, label: &str, id: AtomId) -> Option<usize> {
        let slot = self
            .scopes
            .iter()
            .position(|scope| !scope.contains_key(label))?;
        self.scopes[slot].insert(label.to_string(), id);
        Some(slot)
    }

    pub fn capacity(&self) -> usize {
        self.scopes.len()
    }

    /// Resolves a label tuple in every scope that defines all of its labels.
    pub fn resolve<const N: usize>(&self, labels: &[&str; N]) -> Vec<[AtomId; N]> {
        self.scopes
            .iter()
            .filter_map(|scope| {
                let mut ids = [AtomId::default(); N];
                for (slot, label) in ids.iter_mut().zip(labels.iter()) {
                    *slot = *scope.get(*label)?;
                }
                Some(ids)
            })
            .collect()
    }
}
