//! # Topology Pipeline
//!
//! Merges the reactant-state (RS) and product-state (PS) force-field descriptions of a
//! reacting region into one dual-state topology per coupling window.
//!
//! ## Overview
//!
//! The pipeline runs strictly forward:
//!
//! 1. [`index`] joins the atom declarations of the directive file with the per-state atom
//!    labels used by the fragment files, one label scope per residue occurrence.
//! 2. [`parameters`] resolves the fragment rows of each state into candidate terms, the
//!    full bond and angle connectivity, and Lennard-Jones parameters.
//! 3. [`reconcile`] pairs RS and PS candidates and produces the merged bonded terms,
//!    applying directive overrides last.
//! 4. [`pairs`] derives 1-4 pairs over the [`graph`] of each state and classifies those
//!    that exist in one state only.
//! 5. [`transitions`] extracts the forming and breaking terms that need explicit
//!    non-bonded handling, donor-acceptor pairs and restored exclusions.
//! 6. [`softcore`] assigns soft-core repulsion entries and tabulated potential indices.
//! 7. [`nonbonded`] plans the per-window pair charges, Lennard-Jones pairs and exclusions.
//! 8. [`writer`] inserts the EVB block into the base topology and renders every window;
//!    [`reference`] derives the reference-state topology and [`tables`] the soft-core
//!    potential tables.

pub mod graph;
pub mod index;
pub mod nonbonded;
pub mod pairs;
pub mod parameters;
pub mod reconcile;
pub mod reference;
pub mod softcore;
pub mod tables;
pub mod transitions;
pub mod writer;

use crate::core::io::fragment::FragmentKind;
use crate::core::models::atom::{Serial, State};
use crate::core::models::pair::AtomPair;
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Atom {0} is declared more than once")]
    DuplicateAtom(Serial),
    #[error(
        "Label '{label}' on line {line} is used more often in the {state} than its residues allow"
    )]
    LabelScope {
        label: String,
        state: State,
        line: usize,
    },
    #[error("Atom {0} is not declared in the directive file")]
    UnknownAtom(Serial),
    #[error("No van der Waals parameters for atom {serial} in the {state}")]
    MissingVdw { serial: Serial, state: State },
    #[error("Reacting atom {0} has no dummy type")]
    MissingDummyType(Serial),
    #[error("Base topology has no '; Include Position restraint file' line")]
    MissingAnchor,
    #[error("Malformed [ {section} ] row on line {line} of the base topology")]
    MalformedRow { section: &'static str, line: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Recoverable findings of the pipeline. They are logged and returned with the result.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyWarning {
    MissingFragment {
        residue: String,
        kind: FragmentKind,
    },
    SkippedRow {
        file: String,
        line: usize,
        reason: String,
    },
    /// A donor-acceptor pair without soft-core parameters keeps its Lennard-Jones pair.
    UnsoftenedDonorAcceptor(AtomPair),
    /// A reference-state row whose function type cannot be switched off.
    UnknownFunction {
        section: &'static str,
        line: usize,
        func: String,
    },
}

impl fmt::Display for TopologyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyWarning::MissingFragment { residue, kind } => write!(
                f,
                "No {} fragment found for residue '{residue}'",
                kind.keyword()
            ),
            TopologyWarning::SkippedRow { file, line, reason } => {
                write!(f, "Skipped row {line} of '{file}': {reason}")
            }
            TopologyWarning::UnsoftenedDonorAcceptor(pair) => write!(
                f,
                "Donor-acceptor atoms {} and {} have no soft-core repulsion; Lennard-Jones \
                 interactions are kept instead (add a null soft-core to avoid them)",
                pair.first, pair.second
            ),
            TopologyWarning::UnknownFunction {
                section,
                line,
                func,
            } => write!(
                f,
                "Could not switch off the [ {section} ] row on line {line} (function type {func}); \
                 it is left unchanged"
            ),
        }
    }
}
