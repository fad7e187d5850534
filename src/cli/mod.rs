//! Command-line interface for stackforge
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions and parsing structures (clap)
//! - `run`: Main entry point and command dispatch
//! - `commands`: Command implementations and report printing

pub mod args;
mod commands;
mod run;

pub use args::{CacheCommands, Cli, Commands, build_cli};
pub use run::run;
