//! Provides input/output functionality for the text formats used by EVB jobs.
//!
//! Every format is exposed through the [`traits::TextInput`] and [`traits::TextOutput`]
//! traits, which operate on buffered readers and writers and add path-based convenience
//! methods. Parsers report failures with the offending line number.

pub mod directive;
pub mod format;
pub mod fragment;
pub mod molaris;
pub mod profile;
pub mod qfep;
pub mod topfile;
pub mod traits;
pub mod xvg;
