use super::TopologyError;
use super::index::AtomIndex;
use super::nonbonded::NonbondedPlan;
use super::reconcile::MergedTerms;
use super::softcore::SoftCoreEntry;
use crate::core::io::format::short_float;
use crate::core::io::topfile::{EVB_MARKER, LineKind, SectionCursor, SectionName, TopologyDocument};
use crate::core::models::atom::{Serial, State};
use crate::core::models::pair::{AtomPair, ClassifiedPair};
use crate::core::models::term::{AngleParams, BondParams, TorsionParams};

const RULE: &str = ";----------------------------------------";
const HEADER_LINES: usize = 3;

/// Coupling parameter of every window, `λ_i = i/(F−1)`.
pub fn window_lambdas(count: usize) -> Vec<f64> {
    let steps = count.saturating_sub(1).max(1) as f64;
    (0..count).map(|i| i as f64 / steps).collect()
}

pub fn window_file_name(window: usize) -> String {
    format!("topol_{window:03}.top")
}

/// Comments the base-topology rows that the EVB block replaces and adds state B to the
/// reacting atoms. Only the part before the restraint anchor is edited.
///
/// # Errors
///
/// Returns [`TopologyError::MissingAnchor`] when the anchor line is absent and
/// [`TopologyError::MalformedRow`] for a reacting `[ atoms ]` row without type, charge
/// and mass columns.
pub fn edit_base(
    base: &TopologyDocument,
    index: &AtomIndex,
    merged: &MergedTerms,
    pairs: &[ClassifiedPair],
) -> Result<Vec<String>, TopologyError> {
    let anchor = base.anchor().ok_or(TopologyError::MissingAnchor)?;
    let mut lines = base.lines.clone();
    let mut cursor = SectionCursor::new();

    for (i, line) in base.lines[..anchor].iter().enumerate() {
        let LineKind::Data(tokens) = cursor.advance(line) else {
            continue;
        };
        let serials: Vec<Serial> = tokens.iter().map_while(|t| t.parse().ok()).collect();
        let covered = match cursor.section() {
            Some(SectionName::Atoms) => {
                if let Some(rewritten) = rewrite_atom(line, &tokens, index, i + 1)? {
                    lines[i] = rewritten;
                }
                continue;
            }
            Some(SectionName::Bonds) => <[Serial; 2]>::try_from(prefix(&serials, 2))
                .is_ok_and(|atoms| merged.bonds.iter().any(|b| b.same_atom_set(&atoms))),
            Some(SectionName::Angles) => <[Serial; 3]>::try_from(prefix(&serials, 3))
                .is_ok_and(|atoms| merged.angles.iter().any(|a| a.same_atom_set(&atoms))),
            Some(SectionName::Dihedrals) => {
                <[Serial; 4]>::try_from(prefix(&serials, 4)).is_ok_and(|atoms| {
                    merged
                        .torsions
                        .iter()
                        .chain(&merged.impropers)
                        .any(|d| d.same_atom_set(&atoms))
                })
            }
            Some(SectionName::Pairs) => <[Serial; 2]>::try_from(prefix(&serials, 2))
                .is_ok_and(|atoms| {
                    let pair = AtomPair::from(atoms);
                    pairs
                        .iter()
                        .any(|p| p.pair == pair && p.native_state() == State::Reactant)
                }),
            _ => false,
        };
        if covered {
            lines[i] = format!("; {line}");
        }
    }

    Ok(lines)
}

fn prefix(serials: &[Serial], n: usize) -> &[Serial] {
    &serials[..serials.len().min(n)]
}

fn rewrite_atom(
    line: &str,
    tokens: &[&str],
    index: &AtomIndex,
    line_num: usize,
) -> Result<Option<String>, TopologyError> {
    let Some(record) = tokens
        .first()
        .and_then(|t| t.parse::<Serial>().ok())
        .and_then(|serial| index.atoms().by_serial(serial))
        .filter(|record| record.region.is_reacting())
    else {
        return Ok(None);
    };
    let malformed = TopologyError::MalformedRow {
        section: "atoms",
        line: line_num,
    };
    if tokens.len() < 8 {
        return Err(malformed);
    }
    let mass: f64 = tokens[7].parse().map_err(|_| malformed)?;
    let tail = line.find(';').map_or("", |at| &line[at..]);
    Ok(Some(format!(
        " {:>6} {:>9} {:>6} {:>7} {:>5} {:>6} {:10.6} {:>10} {:>8} {:10.6} {:>10}   {}",
        tokens[0],
        record.reactant.label,
        tokens[2],
        tokens[3],
        tokens[4],
        tokens[5],
        record.reactant.charge,
        tokens[7],
        record.product.label,
        record.product.charge,
        short_float(mass),
        tail
    )))
}

fn columns<I>(values: I, sep: &str) -> String
where
    I: IntoIterator<Item = String>,
{
    values
        .into_iter()
        .map(|v| format!("{sep}{v:>9}"))
        .collect()
}

fn floats(values: &[f64]) -> Vec<String> {
    values.iter().map(|&v| short_float(v)).collect()
}

fn bond_row(atoms: [Serial; 2], params: &BondParams) -> String {
    let values = match params {
        BondParams::Harmonic { a, b } => floats(&[a.eq, a.k, b.eq, b.k]),
        BondParams::Morse { a, b } => floats(&[a.b0, a.depth, a.beta, b.b0, b.depth, b.beta]),
        BondParams::Raw { params, .. } => params.clone(),
    };
    format!(
        " {:>5} {:>5}    {}{}",
        atoms[0],
        atoms[1],
        params.func(),
        columns(values, "     ")
    )
}

fn angle_row(atoms: [Serial; 3], params: &AngleParams) -> String {
    let values = match params {
        AngleParams::Harmonic { a, b } => floats(&[a.eq, a.k, b.eq, b.k]),
        AngleParams::Raw { params, .. } => params.clone(),
    };
    format!(
        " {:>5} {:>5} {:>5}    {}{}",
        atoms[0],
        atoms[1],
        atoms[2],
        params.func(),
        columns(values, "     ")
    )
}

fn dihedral_row(atoms: [Serial; 4], params: &TorsionParams) -> String {
    let values = match params {
        TorsionParams::Ryckaert { a, b } => floats(&[*a, *b].concat()),
        TorsionParams::Improper { a, b } => floats(&[a.eq, a.k, b.eq, b.k]),
        TorsionParams::Periodic {
            a, b, multiplicity, ..
        } => vec![
            short_float(a.phase),
            short_float(a.k),
            multiplicity.to_string(),
            short_float(b.phase),
            short_float(b.k),
        ],
        TorsionParams::Raw { params, .. } => params.clone(),
    };
    format!(
        " {:>5} {:>5} {:>5} {:>5}  {}{}",
        atoms[0],
        atoms[1],
        atoms[2],
        atoms[3],
        params.func(),
        columns(values, "  ")
    )
}

/// The EVB section of a window topology.
#[derive(Debug, Clone, PartialEq)]
pub struct EvbBlock {
    pub lines: Vec<String>,
    /// Offset of the first `[ pairs_nb ]` row within `lines`.
    pairs_nb: usize,
}

impl EvbBlock {
    /// Renders the merged terms, soft-core bonds, constraints and pair interactions.
    /// Pair charges are rendered at `λ = 0`.
    pub fn build(
        merged: &MergedTerms,
        soft: &[SoftCoreEntry],
        constraints: &[String],
        plan: &NonbondedPlan,
    ) -> Self {
        let mut lines: Vec<String> = vec![
            String::new(),
            RULE.to_string(),
            format!("; {EVB_MARKER}"),
            RULE.to_string(),
            String::new(),
        ];

        let mut bonds_open = false;
        let mut open_bonds = |lines: &mut Vec<String>| {
            if !bonds_open {
                lines.push("[ bonds ]".to_string());
                bonds_open = true;
            }
        };
        if !merged.bonds.is_empty() {
            open_bonds(&mut lines);
            lines.push("; harmonic and Morse bonds".to_string());
            lines.extend(merged.bonds.iter().map(|b| bond_row(b.atoms, &b.params)));
        }
        if !soft.is_empty() {
            open_bonds(&mut lines);
            lines.push("; soft-core potential".to_string());
            lines.extend(soft.iter().map(SoftCoreEntry::row));
        }
        if !constraints.is_empty() {
            open_bonds(&mut lines);
            lines.push("; constraints".to_string());
            lines.extend(constraints.iter().cloned());
        }
        lines.push(String::new());

        if !merged.angles.is_empty() {
            lines.push("[ angles ]".to_string());
            lines.extend(merged.angles.iter().map(|a| angle_row(a.atoms, &a.params)));
            lines.push(String::new());
        }

        if !merged.torsions.is_empty() || !merged.impropers.is_empty() {
            lines.push("[ dihedrals ]".to_string());
            if !merged.torsions.is_empty() {
                lines.push("; proper dihedrals".to_string());
                lines.extend(merged.torsions.iter().map(|d| dihedral_row(d.atoms, &d.params)));
            }
            if !merged.impropers.is_empty() {
                lines.push("; improper dihedrals".to_string());
                lines.extend(merged.impropers.iter().map(|d| dihedral_row(d.atoms, &d.params)));
            }
            lines.push(String::new());
        }

        if !plan.is_empty() {
            lines.push("[ exclusions ]".to_string());
            lines.extend(plan.exclusion_rows());
            lines.push(String::new());

            lines.push("[ pairs ]".to_string());
            lines.extend(plan.pair_rows());
            lines.push(String::new());
        }

        // Written even when the plan is empty.
        lines.push("[ pairs_nb ]".to_string());
        let pairs_nb = lines.len();
        lines.extend(plan.pairs_nb_rows(0.0));

        Self { lines, pairs_nb }
    }
}

/// A window topology that is assembled once and re-rendered per window.
///
/// Only the header and the `[ pairs_nb ]` rows depend on the window; everything else is
/// shared by all windows.
#[derive(Debug, Clone)]
pub struct WindowTopology {
    lines: Vec<String>,
    pairs_nb: usize,
    plan: NonbondedPlan,
    lambdas: Vec<f64>,
}

impl WindowTopology {
    /// Inserts the EVB block into the edited base topology before the line preceding the
    /// restraint anchor.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::MissingAnchor`] when the anchor line is absent.
    pub fn assemble(
        edited: Vec<String>,
        block: EvbBlock,
        plan: NonbondedPlan,
        window_count: usize,
    ) -> Result<Self, TopologyError> {
        let document = TopologyDocument::new(edited);
        let anchor = document.anchor().ok_or(TopologyError::MissingAnchor)?;
        let insert_at = HEADER_LINES + anchor.saturating_sub(1);

        let mut lines = Vec::with_capacity(HEADER_LINES + document.lines.len() + block.lines.len());
        lines.extend(header(0, window_count, 0.0));
        lines.extend(document.lines);
        let pairs_nb = insert_at + block.pairs_nb;
        lines.splice(insert_at..insert_at, block.lines);

        Ok(Self {
            lines,
            pairs_nb,
            plan,
            lambdas: window_lambdas(window_count),
        })
    }

    pub fn window_count(&self) -> usize {
        self.lambdas.len()
    }

    pub fn lambda(&self, window: usize) -> Option<f64> {
        self.lambdas.get(window).copied()
    }

    /// Lines of `window`, rewriting the header and the pair charges in place.
    pub fn render(&mut self, window: usize) -> &[String] {
        let count = self.lambdas.len();
        let lambda = self.lambda(window).unwrap_or(1.0);
        for (slot, line) in self.lines.iter_mut().zip(header(window, count, lambda)) {
            *slot = line;
        }
        for (offset, row) in self.plan.pairs_nb_rows(lambda).enumerate() {
            self.lines[self.pairs_nb + offset] = row;
        }
        &self.lines
    }

    /// Lines of `window` without the window header.
    pub fn body(&mut self, window: usize) -> &[String] {
        self.render(window);
        &self.lines[HEADER_LINES..]
    }
}

fn header(window: usize, count: usize, lambda: f64) -> [String; HEADER_LINES] {
    [
        "; Topology for EVB simulation in GROMACS, generated by evbkit".to_string(),
        format!("; Window {window} of {count}, lambda = {lambda:.4}"),
        RULE.to_string(),
    ]
}
