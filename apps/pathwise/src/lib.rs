//! # Pathwise Library
//!
//! Command-line surface of the Pathwise diagnostics binary, exposed as a library so
//! the integration tests can drive commands without spawning a process.

pub mod cli;
pub mod config;
