//! Command-line interface module.
//!
//! Provides argument parsing and the subcommand implementations.

pub mod args;
pub mod commands;
