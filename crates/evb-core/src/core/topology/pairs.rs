use super::graph::BondGraph;
use super::parameters::Connectivity;
use crate::core::models::atom::{AtomTable, State};
use crate::core::models::pair::{AtomPair, ClassifiedPair, PairCode, Relation};

/// Genuine 1-4 pairs of one state.
///
/// Pairs whose atoms also share an angle close a four- or five-membered ring and are not
/// treated as 1-4 interactions.
pub fn one_four_pairs(atoms: &AtomTable, connectivity: &Connectivity) -> Vec<AtomPair> {
    BondGraph::new(atoms, &connectivity.bonds)
        .one_four_pairs()
        .into_iter()
        .filter(|&pair| !connectivity.shares_angle(pair))
        .collect()
}

/// How the pair relates in the state described by `connectivity`.
pub fn relation_in(connectivity: &Connectivity, pair: AtomPair) -> Relation {
    if connectivity.is_bonded(pair) {
        Relation::Bond
    } else if connectivity.spans_angle(pair) {
        Relation::Angle
    } else {
        Relation::Nonbonded
    }
}

/// Classifies the 1-4 pairs that exist in one state only.
///
/// Reactant-only pairs come first, then product-only pairs, each in discovery order. A
/// pair that is 1-4 in both states is not affected by the reaction and is dropped.
pub fn classify(atoms: &AtomTable, reactant: &Connectivity, product: &Connectivity) -> Vec<ClassifiedPair> {
    let rs_pairs = one_four_pairs(atoms, reactant);
    let ps_pairs = one_four_pairs(atoms, product);

    let mut classified = Vec::new();
    for state in State::BOTH {
        let (native, other, other_conn) = match state {
            State::Reactant => (&rs_pairs, &ps_pairs, product),
            State::Product => (&ps_pairs, &rs_pairs, reactant),
        };
        for &pair in native.iter().filter(|pair| !other.contains(pair)) {
            let relation = relation_in(other_conn, pair);
            let code = match state {
                State::Reactant => PairCode::new(Relation::Pair, relation),
                State::Product => PairCode::new(relation, Relation::Pair),
            };
            classified.push(ClassifiedPair { pair, code });
        }
    }
    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{AtomRecord, Region, Serial, StateAtom};

    fn table(n: usize) -> AtomTable {
        let mut table = AtomTable::new();
        for serial in 1..=n {
            let atom = StateAtom {
                label: format!("A{serial}"),
                charge: 0.0,
            };
            table.insert(AtomRecord {
                serial,
                reactant: atom.clone(),
                product: atom,
                dummy_type: None,
                region: Region::Reacting,
            });
        }
        table
    }

    fn connectivity(bonds: &[(Serial, Serial)], angles: &[[Serial; 3]]) -> Connectivity {
        Connectivity {
            bonds: bonds.iter().map(|&(a, b)| AtomPair::new(a, b)).collect(),
            angles: angles.to_vec(),
        }
    }

    #[test]
    fn ring_closure_turns_one_four_pair_into_bond() {
        let atoms = table(4);
        let rs = connectivity(&[(1, 2), (2, 3), (3, 4)], &[[1, 2, 3], [2, 3, 4]]);
        let ps = connectivity(
            &[(1, 2), (2, 3), (3, 4), (4, 1)],
            &[[1, 2, 3], [2, 3, 4], [3, 4, 1], [4, 1, 2]],
        );
        let classified = classify(&atoms, &rs, &ps);
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].pair, AtomPair::new(1, 4));
        assert_eq!(classified[0].code.value(), 42);
    }

    #[test]
    fn product_only_pair_without_reactant_relation_is_fifty_four() {
        let atoms = table(4);
        let rs = connectivity(&[(1, 2), (2, 3)], &[[1, 2, 3]]);
        let ps = connectivity(&[(1, 2), (2, 3), (3, 4)], &[[1, 2, 3], [2, 3, 4]]);
        let classified = classify(&atoms, &rs, &ps);
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].code.value(), 54);
        assert_eq!(classified[0].native_state(), State::Product);
    }

    #[test]
    fn pair_becoming_angle_ends_is_forty_three() {
        let atoms = table(4);
        let rs = connectivity(&[(1, 2), (2, 3), (3, 4)], &[[1, 2, 3], [2, 3, 4]]);
        // Atom 4 moves onto atom 2 in the product.
        let ps = connectivity(&[(1, 2), (2, 3), (2, 4)], &[[1, 2, 3], [1, 2, 4], [3, 2, 4]]);
        let classified = classify(&atoms, &rs, &ps);
        let pair = classified
            .iter()
            .find(|c| c.pair == AtomPair::new(1, 4))
            .unwrap();
        assert_eq!(pair.code.value(), 43);
    }

    #[test]
    fn state_exclusive_sets_never_overlap() {
        let atoms = table(6);
        let rs = connectivity(&[(1, 2), (2, 3), (3, 4), (4, 5)], &[[1, 2, 3], [2, 3, 4], [3, 4, 5]]);
        let ps = connectivity(&[(2, 3), (3, 4), (4, 5), (5, 6)], &[[2, 3, 4], [3, 4, 5], [4, 5, 6]]);
        let classified = classify(&atoms, &rs, &ps);
        let rs_only: Vec<_> = classified
            .iter()
            .filter(|c| c.native_state() == State::Reactant)
            .map(|c| c.pair)
            .collect();
        let ps_only: Vec<_> = classified
            .iter()
            .filter(|c| c.native_state() == State::Product)
            .map(|c| c.pair)
            .collect();
        assert!(!rs_only.is_empty() && !ps_only.is_empty());
        assert!(rs_only.iter().all(|p| !ps_only.contains(p)));
        assert!(!classified.iter().any(|c| c.pair == AtomPair::new(2, 5)));
    }

    #[test]
    fn five_membered_ring_has_no_one_four_pairs() {
        let atoms = table(5);
        let conn = connectivity(
            &[(1, 2), (2, 3), (3, 4), (4, 5), (5, 1)],
            &[[1, 2, 3], [2, 3, 4], [3, 4, 5], [4, 5, 1], [5, 1, 2]],
        );
        assert!(one_four_pairs(&atoms, &conn).is_empty());
    }
}
