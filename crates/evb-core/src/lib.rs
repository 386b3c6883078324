//! # EVB Toolkit Core Library
//!
//! Topology merging and free-energy profile estimation for Empirical Valence Bond (EVB)
//! simulations driven by GROMACS.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture so that parsing, numerics and
//! orchestration stay separately testable.
//!
//! - **[`core`]: The Foundation.** Stateless data models (atoms, bonded terms, pair codes),
//!   file formats, the topology-merging pipeline and the free-energy estimator.
//!
//! - **[`engine`]: Cross-cutting Services.** The error taxonomy, validated job
//!   configuration built through builders, and progress reporting.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures that tie `engine` and `core`
//!   together: building per-window topologies, mapping energies onto a free-energy profile,
//!   and analysing replica profiles.

pub mod core;
pub mod engine;
pub mod workflows;
