use crate::core::models::atom::{AtomTable, Serial};
use crate::core::models::ids::AtomId;
use crate::core::models::pair::AtomPair;
use slotmap::SecondaryMap;

/// Adjacency index over the bonds of one state.
///
/// Neighbour lists keep bond insertion order, so every traversal is deterministic.
#[derive(Debug, Clone)]
pub struct BondGraph<'a> {
    atoms: &'a AtomTable,
    bonds: Vec<(AtomId, AtomId)>,
    adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
}

impl<'a> BondGraph<'a> {
    /// Builds the graph; bonds naming undeclared atoms or repeating an earlier bond are ignored.
    pub fn new(atoms: &'a AtomTable, bonds: &[AtomPair]) -> Self {
        let mut graph = Self {
            atoms,
            bonds: Vec::with_capacity(bonds.len()),
            adjacency: SecondaryMap::new(),
        };
        for bond in bonds {
            let (Some(a), Some(b)) = (atoms.id_of(bond.first), atoms.id_of(bond.second)) else {
                continue;
            };
            if a == b || graph.neighbour_ids(a).contains(&b) {
                continue;
            }
            graph.bonds.push((a, b));
            graph.link(a, b);
            graph.link(b, a);
        }
        graph
    }

    fn link(&mut self, from: AtomId, to: AtomId) {
        match self.adjacency.get_mut(from) {
            Some(list) => list.push(to),
            None => {
                self.adjacency.insert(from, vec![to]);
            }
        }
    }

    fn neighbour_ids(&self, id: AtomId) -> &[AtomId] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn are_bonded(&self, a: Serial, b: Serial) -> bool {
        match (self.atoms.id_of(a), self.atoms.id_of(b)) {
            (Some(a), Some(b)) => self.neighbour_ids(a).contains(&b),
            _ => false,
        }
    }

    pub fn neighbours(&self, serial: Serial) -> Vec<Serial> {
        self.atoms
            .id_of(serial)
            .map(|id| {
                self.neighbour_ids(id)
                    .iter()
                    .filter_map(|&n| self.atoms.serial_of(n))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ends of every three-bond path `a-b-c-d`, walked around each bond `b-c`.
    ///
    /// Pairs closing a three-membered ring (`a == d`) and pairs that are themselves bonded
    /// are dropped; the rest are deduplicated regardless of orientation.
    pub fn one_four_pairs(&self) -> Vec<AtomPair> {
        let mut pairs: Vec<AtomPair> = Vec::new();
        for &(b, c) in &self.bonds {
            for &a in self.neighbour_ids(b).iter().filter(|&&a| a != c) {
                for &d in self.neighbour_ids(c).iter().filter(|&&d| d != b) {
                    if a == d || self.neighbour_ids(a).contains(&d) {
                        continue;
                    }
                    let (Some(first), Some(second)) =
                        (self.atoms.serial_of(a), self.atoms.serial_of(d))
                    else {
                        continue;
                    };
                    let pair = AtomPair::new(first, second);
                    if !pairs.contains(&pair) {
                        pairs.push(pair);
                    }
                }
            }
        }
        pairs
    }
}
