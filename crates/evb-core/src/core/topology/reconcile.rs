use super::parameters::{StateParameters, StateTerm, TorsionValues};
use crate::core::io::directive::Directive;
use crate::core::models::term::{
    Angle, AngleParams, Bond, BondParams, Dihedral, Harmonic, Periodic, Term, TorsionParams,
    Transition, apply_override,
};

/// Bonded terms of the reacting region, merged across both states.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedTerms {
    pub bonds: Vec<Bond>,
    pub angles: Vec<Angle>,
    pub torsions: Vec<Dihedral>,
    pub impropers: Vec<Dihedral>,
}

impl MergedTerms {
    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
            && self.angles.is_empty()
            && self.torsions.is_empty()
            && self.impropers.is_empty()
    }
}

/// Merges the candidate terms of both states and applies the directive overrides.
///
/// Terms are ordered by discovery: every reactant term in reactant order, followed by the
/// product-only terms in product order, followed by appended overrides.
pub fn reconcile(
    reactant: &StateParameters,
    product: &StateParameters,
    directive: &Directive,
) -> MergedTerms {
    let mut merged = MergedTerms {
        bonds: merge_bonds(&reactant.bonds, &product.bonds),
        angles: merge_angles(&reactant.angles, &product.angles),
        torsions: merge_dihedrals(&reactant.torsions, &product.torsions),
        impropers: merge_dihedrals(&reactant.impropers, &product.impropers),
    };

    for bond in &directive.bonds {
        apply_override(&mut merged.bonds, bond.clone());
    }
    for angle in &directive.angles {
        apply_override(&mut merged.angles, angle.clone());
    }
    for torsion in &directive.torsions {
        apply_override(&mut merged.torsions, torsion.clone());
    }
    for improper in &directive.impropers {
        apply_override(&mut merged.impropers, improper.clone());
    }
    merged
}

/// Pairs bonds by atom set. Bonds are always written harmonic; a bond missing from one
/// state gets a zero length and force constant there.
pub fn merge_bonds(reactant: &[StateTerm<2, Harmonic>], product: &[StateTerm<2, Harmonic>]) -> Vec<Bond> {
    merge(
        reactant,
        product,
        |rs, ps| rs.same_atom_set(&ps.atoms),
        |a, b| harmonic_pair(a, b).map(|(a, b)| BondParams::Harmonic { a, b }),
    )
}

/// Pairs angles by atom path, in either direction.
pub fn merge_angles(reactant: &[StateTerm<3, Harmonic>], product: &[StateTerm<3, Harmonic>]) -> Vec<Angle> {
    merge(
        reactant,
        product,
        |rs, ps| rs.same_path(&ps.atoms),
        |a, b| harmonic_pair(a, b).map(|(a, b)| AngleParams::Harmonic { a, b }),
    )
}

/// Pairs dihedrals by atom path and function type; the parameter layout follows the
/// function type of each term.
pub fn merge_dihedrals(
    reactant: &[StateTerm<4, TorsionValues>],
    product: &[StateTerm<4, TorsionValues>],
) -> Vec<Dihedral> {
    merge(
        reactant,
        product,
        |rs, ps| rs.same_path(&ps.atoms) && rs.value.func() == ps.value.func(),
        torsion_params,
    )
}

fn merge<const N: usize, V: Copy, P>(
    reactant: &[StateTerm<N, V>],
    product: &[StateTerm<N, V>],
    same: impl Fn(&StateTerm<N, V>, &StateTerm<N, V>) -> bool,
    combine: impl Fn(Option<V>, Option<V>) -> Option<P>,
) -> Vec<Term<N, P>> {
    let mut merged = Vec::with_capacity(reactant.len() + product.len());

    for rs in reactant {
        let partner = product.iter().find(|ps| same(rs, ps));
        let transition = match partner {
            Some(_) => Transition::Shared,
            None => Transition::Breaking,
        };
        if let Some(params) = combine(Some(rs.value), partner.map(|ps| ps.value)) {
            merged.push(Term::derived(rs.atoms, params, transition));
        }
    }

    for ps in product {
        if reactant.iter().any(|rs| same(rs, ps)) {
            continue;
        }
        if let Some(params) = combine(None, Some(ps.value)) {
            merged.push(Term::derived(ps.atoms, params, Transition::Forming));
        }
    }

    merged
}

fn harmonic_pair(a: Option<Harmonic>, b: Option<Harmonic>) -> Option<(Harmonic, Harmonic)> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a, b)),
        (Some(a), None) => Some((a, Harmonic::ZERO)),
        (None, Some(b)) => Some((Harmonic::ZERO, b)),
        (None, None) => None,
    }
}

fn periodic_off(term: Periodic) -> Periodic {
    Periodic {
        phase: term.phase,
        k: 0.0,
    }
}

fn torsion_params(a: Option<TorsionValues>, b: Option<TorsionValues>) -> Option<TorsionParams> {
    use TorsionValues as V;
    match (a, b) {
        (Some(V::Ryckaert(a)), Some(V::Ryckaert(b))) => Some(TorsionParams::Ryckaert { a, b }),
        (Some(V::Ryckaert(a)), None) => Some(TorsionParams::Ryckaert { a, b: [0.0; 6] }),
        (None, Some(V::Ryckaert(b))) => Some(TorsionParams::Ryckaert { a: [0.0; 6], b }),
        (Some(V::Improper(a)), b @ (Some(V::Improper(_)) | None)) => {
            let b = match b {
                Some(V::Improper(b)) => b,
                _ => a.switched_off(),
            };
            Some(TorsionParams::Improper { a, b })
        }
        (None, Some(V::Improper(b))) => Some(TorsionParams::Improper {
            a: b.switched_off(),
            b,
        }),
        (
            Some(V::Periodic {
                func,
                term: a,
                multiplicity,
            }),
            b,
        ) => {
            let b = match b {
                Some(V::Periodic { term, .. }) => term,
                _ => periodic_off(a),
            };
            Some(TorsionParams::Periodic {
                func,
                a,
                b,
                multiplicity,
            })
        }
        (
            None,
            Some(V::Periodic {
                func,
                term: b,
                multiplicity,
            }),
        ) => Some(TorsionParams::Periodic {
            func,
            a: periodic_off(b),
            b,
            multiplicity,
        }),
        _ => None,
    }
}
