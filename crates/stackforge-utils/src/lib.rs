//! Foundation utilities shared by every stackforge crate: the error model,
//! exit codes, shared report types, atomic writes, filesystem helpers and
//! tracing setup.

pub mod atomic_write;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod paths;
pub mod types;
