//! Storage layer for rulestore.
//!
//! Persists policy rules in a single `SQLite` table. The adapter handles
//! loading (full and filtered), whole-model saves, and incremental
//! mutations with transaction support.

pub mod config;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use config::{AdapterOptions, Database};
pub use schema::DEFAULT_TABLE_NAME;
pub use sqlite::SqliteAdapter;
pub use traits::Adapter;

/// Default database path relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "policy.db";
