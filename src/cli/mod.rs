//! CLI layer for rulestore.
//!
//! Provides the command-line interface using clap, with commands for
//! initializing the policy table, editing rules, and importing or exporting
//! policy files.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
