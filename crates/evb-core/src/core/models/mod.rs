//! # Core Models Module
//!
//! Data structures describing a dual-state EVB system: the atoms of the reacting region,
//! the bonded terms reconciled between the two states, and the codes that describe how an
//! atom pair changes its relationship across the reaction.
//!
//! ## Key Components
//!
//! - [`atom`] - Per-state atom data, the atom table and residue label scopes
//! - [`term`] - Merged bonds, angles and dihedrals with per-state parameters
//! - [`pair`] - Unordered atom pairs and reactant/product relationship codes
//! - [`ids`] - Arena keys for atoms
//!
//! Atoms are identified by the serial number they carry in the base topology. Internally
//! they live in a slot map and are addressed by [`ids::AtomId`]; the
//! [`atom::AtomTable`] maintains the mapping in both directions.

pub mod atom;
pub mod ids;
pub mod pair;
pub mod term;
