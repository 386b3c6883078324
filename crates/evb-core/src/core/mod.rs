//! # Core Module
//!
//! The computational core of the toolkit: data models, file formats, the topology-merging
//! pipeline and the free-energy estimator.
//!
//! ## Overview
//!
//! An EVB job couples two force-field descriptions of the same reacting region: the
//! reactant state (RS) and the product state (PS). The core module reconciles the two
//! descriptions into dual-state GROMACS topologies, one per coupling window, and later
//! turns the energies sampled in those windows into a free-energy profile along the
//! energy-gap reaction coordinate.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Atom records, merged bonded terms and pair relationship codes
//! - **File I/O** ([`io`]) - Directive files, force-field fragments, GROMACS topologies and energy series
//! - **Topology Pipeline** ([`topology`]) - Term reconciliation, pair classification, soft-core
//!   assignment and window topology writing
//! - **Free-Energy Estimation** ([`estimator`]) - Zwanzig exponential averaging, umbrella-sampling
//!   reweighting, basin detection and replica statistics
//!
//! ## Data Flow
//!
//! Stages run strictly forward: parser, reconciler, pair classifier, soft-core assigner and
//! window writer form the topology pipeline. The estimator is an independent downstream
//! pipeline that consumes simulation output produced with the written topologies.

pub mod estimator;
pub mod io;
pub mod models;
pub mod topology;
