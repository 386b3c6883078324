//! # Workflows Module
//!
//! High-level procedures that tie the engine services and the core pipelines together.
//!
//! ## Overview
//!
//! Workflows are the entry points for users of the library. Each one validates its inputs,
//! drives the relevant core stages in order, reports progress phases, logs recoverable
//! findings as warnings and returns them alongside the result.
//!
//! ## Architecture
//!
//! - **Topology Build** ([`build`]) - Per-window dual-state topologies, the reference
//!   topology and the soft-core tables from a directive, a base topology and fragments
//! - **Profile Mapping** ([`map`]) - Energy series to a free-energy profile along the
//!   energy gap
//! - **Profile Analysis** ([`analyze`]) - Barrier statistics and polynomial fits over
//!   replica profiles
//! - **Export** ([`export`]) - Sampled energies in the input layout of Q's `qfep`

pub mod analyze;
pub mod build;
pub mod export;
pub mod map;
