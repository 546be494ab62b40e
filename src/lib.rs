//! # rulestore
//!
//! `SQLite` storage adapter for authorization policy rules.
//!
//! Rule engines keep their policy as tuples of up to six strings tagged
//! with a policy type (`p, alice, data1, read`, `g, alice, admin`). This
//! crate persists those tuples in one relational table and restores them
//! on demand.
//!
//! ## Features
//!
//! - **Full and filtered loads**: positional patterns with wildcards
//! - **Atomic saves**: whole-model replacement in a single transaction
//! - **Incremental edits**: add/remove single rules or batches
//! - **CLI**: `rulestore` binary for inspecting and editing a policy database

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod cli;
pub mod core;
pub mod error;
pub mod storage;

// Re-export commonly used types at crate root
pub use error::{Error, Result, StorageError};

// Re-export core domain types
pub use crate::core::{
    AnyOf, Filter, MAX_FIELDS, PolicyModel, PolicyRecord, PolicySink, PolicySource, Predicate,
    RuleFamily,
};

// Re-export storage types
pub use storage::{Adapter, AdapterOptions, DEFAULT_DB_PATH, Database, SqliteAdapter};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
