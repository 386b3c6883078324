use super::TopologyError;
use crate::core::io::directive::AtomDeclaration;
use crate::core::models::atom::{AtomRecord, AtomTable, LabelScopes, Serial, State};

/// Atom table of the reacting region together with the per-state label scopes that map
/// fragment labels onto atom serials.
#[derive(Debug, Clone)]
pub struct AtomIndex {
    atoms: AtomTable,
    scopes: [LabelScopes; 2],
}

impl AtomIndex {
    /// Builds the index from the `[atoms]` declarations and the residue lists of both states.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::LabelScope`] when a label occurs more often in one state than
    /// the most frequent residue of that state, and [`TopologyError::DuplicateAtom`] when a
    /// serial is declared twice.
    pub fn build<S: AsRef<str>>(
        declarations: &[AtomDeclaration],
        reactants: &[S],
        products: &[S],
    ) -> Result<Self, TopologyError> {
        let mut atoms = AtomTable::new();
        let mut scopes = [
            LabelScopes::for_residues(reactants),
            LabelScopes::for_residues(products),
        ];

        for decl in declarations {
            let id = atoms
                .insert(AtomRecord {
                    serial: decl.serial,
                    reactant: decl.reactant.clone(),
                    product: decl.product.clone(),
                    dummy_type: decl.dummy_type.clone(),
                    region: decl.region,
                })
                .ok_or(TopologyError::DuplicateAtom(decl.serial))?;

            for state in State::BOTH {
                let label = match state {
                    State::Reactant => &decl.reactant.label,
                    State::Product => &decl.product.label,
                };
                scopes[state.index()]
                    .assign(label, id)
                    .ok_or_else(|| TopologyError::LabelScope {
                        label: label.clone(),
                        state,
                        line: decl.line,
                    })?;
            }
        }

        Ok(Self { atoms, scopes })
    }

    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    pub fn record(&self, serial: Serial) -> Result<&AtomRecord, TopologyError> {
        self.atoms
            .by_serial(serial)
            .ok_or(TopologyError::UnknownAtom(serial))
    }

    /// Serials of every residue occurrence in which all `labels` are defined.
    pub fn resolve<const N: usize>(&self, state: State, labels: &[&str; N]) -> Vec<[Serial; N]> {
        self.scopes[state.index()]
            .resolve(labels)
            .into_iter()
            .filter_map(|ids| {
                let mut serials = [0; N];
                for (slot, id) in serials.iter_mut().zip(ids) {
                    *slot = self.atoms.serial_of(id)?;
                }
                Some(serials)
            })
            .collect()
    }

    pub fn all_reacting(&self, serials: &[Serial]) -> bool {
        serials.iter().all(|&serial| self.atoms.is_reacting(serial))
    }

    /// Sum of the region flags of `serials`.
    pub fn region_sum(&self, serials: &[Serial]) -> u32 {
        serials
            .iter()
            .filter_map(|&serial| self.atoms.by_serial(serial))
            .map(|atom| u32::from(atom.region.flag()))
            .sum()
    }
}
