//! Layered configuration for the subcommands.
//!
//! Values resolve in the order CLI flag, config file (after `-S key=value` overrides),
//! then [`defaults::DefaultsConfig`].

mod builder;
mod defaults;
mod file;

pub use builder::{analysis_config, build_config, mapping_config};
