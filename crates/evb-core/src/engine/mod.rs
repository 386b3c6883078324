//! # Engine Module
//!
//! Cross-cutting services shared by every workflow of the toolkit.
//!
//! ## Overview
//!
//! The engine does no chemistry or numerics of its own. It validates job parameters before
//! any file is touched, names the stage in which a job failed, and forwards progress events
//! to whatever front end is driving the library.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Builders for topology, mapping, analysis and export jobs
//! - **Error Handling** ([`error`]) - The [`error::EvbError`] taxonomy and pipeline [`error::Stage`]s
//! - **Progress Monitoring** ([`progress`]) - Phase and task events delivered through an optional callback

pub mod config;
pub mod error;
pub mod progress;
