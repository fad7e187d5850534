//! CLI command implementations.
//!
//! Each handler returns the exit code for a completed command, or an error
//! that `run` renders.

mod cache;
mod common;
mod doctor;
mod generate;
mod preview;

pub use cache::execute_cache_command;
pub use doctor::execute_doctor_command;
pub use generate::execute_generate_command;
pub use preview::execute_preview_command;
