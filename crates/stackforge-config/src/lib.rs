//! Configuration management for stackforge
//!
//! Hierarchical configuration with discovery and precedence: CLI > file >
//! defaults. The TOML file has `[defaults]`, `[cache]` and `[[components]]`
//! sections; component options are parsed into a typed variant per component
//! type at the boundary so downstream code never inspects a loose map.

mod cli_args;
mod components;
mod discovery;
mod model;
mod sources;
mod validation;

pub use cli_args::CliArgs;
pub use components::{
    AndroidOptions, ComponentOptions, ComponentSpec, GoBackendOptions, IosOptions, NextjsOptions,
    PackageManager,
};
pub use model::*;
pub use stackforge_utils::types::ConfigSource;
