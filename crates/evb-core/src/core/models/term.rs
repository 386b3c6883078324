use super::atom::{Serial, State};

/// How a merged bonded term changes across the reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Present in both states.
    Shared,
    /// Present in the reactant state only.
    Breaking,
    /// Present in the product state only.
    Forming,
}

/// Where a merged term came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Derived,
    Directive,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Harmonic {
    pub eq: f64,
    pub k: f64,
}

impl Harmonic {
    pub const ZERO: Harmonic = Harmonic { eq: 0.0, k: 0.0 };

    pub fn new(eq: f64, k: f64) -> Self {
        Self { eq, k }
    }

    /// Same equilibrium value with the force constant switched off.
    pub fn switched_off(self) -> Self {
        Self { eq: self.eq, k: 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Morse {
    pub b0: f64,
    pub depth: f64,
    pub beta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Periodic {
    pub phase: f64,
    pub k: f64,
}

/// Per-state bond parameters. `Raw` keeps directive rows with a function type the toolkit
/// does not interpret; they are written through verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum BondParams {
    Harmonic { a: Harmonic, b: Harmonic },
    Morse { a: Morse, b: Morse },
    Raw { func: u32, params: Vec<String> },
}

impl BondParams {
    pub fn func(&self) -> u32 {
        match self {
            BondParams::Harmonic { .. } => 1,
            BondParams::Morse { .. } => 3,
            BondParams::Raw { func, .. } => *func,
        }
    }

    /// Force constant (harmonic) or well depth (Morse) in `state`; `None` for raw rows.
    pub fn strength(&self, state: State) -> Option<f64> {
        match (self, state) {
            (BondParams::Harmonic { a, .. }, State::Reactant) => Some(a.k),
            (BondParams::Harmonic { b, .. }, State::Product) => Some(b.k),
            (BondParams::Morse { a, .. }, State::Reactant) => Some(a.depth),
            (BondParams::Morse { b, .. }, State::Product) => Some(b.depth),
            (BondParams::Raw { .. }, _) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AngleParams {
    Harmonic { a: Harmonic, b: Harmonic },
    Raw { func: u32, params: Vec<String> },
}

impl AngleParams {
    pub fn func(&self) -> u32 {
        match self {
            AngleParams::Harmonic { .. } => 1,
            AngleParams::Raw { func, .. } => *func,
        }
    }

    pub fn strength(&self, state: State) -> Option<f64> {
        match (self, state) {
            (AngleParams::Harmonic { a, .. }, State::Reactant) => Some(a.k),
            (AngleParams::Harmonic { b, .. }, State::Product) => Some(b.k),
            (AngleParams::Raw { .. }, _) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TorsionParams {
    /// Ryckaert-Bellemans coefficients C0..C5 (function 3).
    Ryckaert { a: [f64; 6], b: [f64; 6] },
    /// Harmonic improper (function 2).
    Improper { a: Harmonic, b: Harmonic },
    /// Periodic proper or improper (functions 1, 4 and 9).
    Periodic {
        func: u32,
        a: Periodic,
        b: Periodic,
        multiplicity: u32,
    },
    Raw { func: u32, params: Vec<String> },
}

impl TorsionParams {
    pub fn func(&self) -> u32 {
        match self {
            TorsionParams::Ryckaert { .. } => 3,
            TorsionParams::Improper { .. } => 2,
            TorsionParams::Periodic { func, .. } | TorsionParams::Raw { func, .. } => *func,
        }
    }
}

/// A bonded term over `N` atoms, reconciled across the two states.
#[derive(Debug, Clone, PartialEq)]
pub struct Term<const N: usize, P> {
    pub atoms: [Serial; N],
    pub params: P,
    pub transition: Transition,
    pub origin: Origin,
}

pub type Bond = Term<2, BondParams>;
pub type Angle = Term<3, AngleParams>;
pub type Dihedral = Term<4, TorsionParams>;

impl<const N: usize, P> Term<N, P> {
    pub fn derived(atoms: [Serial; N], params: P, transition: Transition) -> Self {
        Self {
            atoms,
            params,
            transition,
            origin: Origin::Derived,
        }
    }

    pub fn from_directive(atoms: [Serial; N], params: P) -> Self {
        Self {
            atoms,
            params,
            transition: Transition::Shared,
            origin: Origin::Directive,
        }
    }

    /// Atom serials sorted, for order-insensitive comparisons.
    pub fn atom_set(&self) -> [Serial; N] {
        let mut atoms = self.atoms;
        atoms.sort_unstable();
        atoms
    }

    pub fn same_atom_set(&self, atoms: &[Serial; N]) -> bool {
        let mut other = *atoms;
        other.sort_unstable();
        self.atom_set() == other
    }

    /// Exact or reversed atom order.
    pub fn same_path(&self, atoms: &[Serial; N]) -> bool {
        self.atoms == *atoms || self.atoms.iter().eq(atoms.iter().rev())
    }

    pub fn contains(&self, serial: Serial) -> bool {
        self.atoms.contains(&serial)
    }

    pub fn is_solo(&self) -> bool {
        self.transition != Transition::Shared
    }
}

impl<P> Term<3, P> {
    pub fn ends(&self) -> [Serial; 2] {
        [self.atoms[0], self.atoms[2]]
    }
}

impl Bond {
    /// Whether the bond exerts any force in `state`. Raw rows are treated as active.
    pub fn is_active(&self, state: State) -> bool {
        self.params.strength(state).is_none_or(|k| k != 0.0)
    }
}

impl Angle {
    pub fn is_active(&self, state: State) -> bool {
        self.params.strength(state).is_none_or(|k| k != 0.0)
    }
}

/// Replaces the first term over the same atom set, or appends the override.
pub fn apply_override<const N: usize, P>(terms: &mut Vec<Term<N, P>>, replacement: Term<N, P>) {
    match terms
        .iter_mut()
        .find(|term| term.same_atom_set(&replacement.atoms))
    {
        Some(existing) => {
            existing.params = replacement.params;
            existing.origin = Origin::Directive;
        }
        None => terms.push(replacement),
    }
}
