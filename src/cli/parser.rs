//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use crate::error::Result;
use crate::storage::{AdapterOptions, DEFAULT_DB_PATH, Database};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rulestore: manage authorization policy rules stored in `SQLite`.
#[derive(Parser, Debug)]
#[command(name = "rulestore")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the policy database file.
    ///
    /// Defaults to `policy.db` in the current directory.
    #[arg(short, long, env = "RULESTORE_DB", global = true)]
    pub db_path: Option<PathBuf>,

    /// Policy table name.
    #[arg(short, long, env = "RULESTORE_TABLE", global = true)]
    pub table: Option<String>,

    /// JSON file with adapter options.
    ///
    /// `--db-path` and `--table` override the values it contains.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the policy table if it does not exist.
    Init,

    /// Show database and rule counts.
    Status,

    /// Print stored rules as policy lines.
    #[command(name = "list", alias = "ls")]
    List {
        /// Only load rules matching this JSON filter, e.g. '{"p": [["alice"]]}'.
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Add one rule.
    Add {
        /// Policy type (p, g, ...).
        ptype: String,

        /// Rule fields, in order.
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Remove every row exactly matching a rule.
    #[command(alias = "rm")]
    Remove {
        /// Policy type (p, g, ...).
        ptype: String,

        /// Rule fields, in order.
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Remove rows matching field values starting at a field index.
    RemoveFiltered {
        /// Policy type (p, g, ...).
        ptype: String,

        /// Position of the first value (0 = v0).
        field_index: usize,

        /// Values to match; pass "" to leave a position unconstrained.
        values: Vec<String>,
    },

    /// Replace all stored rules with the contents of a policy file.
    Import {
        /// Policy file with one `ptype, v0, v1, ...` rule per line.
        file: PathBuf,
    },

    /// Write all stored rules as a policy file.
    Export {
        /// Output file path (stdout if not specified).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
    }

    /// Builds adapter options from the config file and flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or the
    /// resulting options are invalid.
    pub fn adapter_options(&self) -> Result<AdapterOptions> {
        let mut options = match &self.config {
            Some(path) => AdapterOptions::from_json_file(path)?,
            None => AdapterOptions::file(self.get_db_path()),
        };

        if let Some(path) = &self.db_path {
            options.database = Database::File(path.clone());
        }
        if let Some(table) = &self.table {
            options.table_name.clone_from(table);
        }

        options.validate()?;
        Ok(options)
    }
}
