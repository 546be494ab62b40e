//! Adapter connection options.

use crate::error::{Error, IoError, Result};
use crate::storage::schema::{DEFAULT_TABLE_NAME, validate_table_name};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the policy database lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    /// Private in-memory database (lost on close).
    Memory,
    /// `SQLite` database file.
    File(PathBuf),
}

/// Options supplied when constructing an adapter.
///
/// Deserializable from JSON, for example:
///
/// ```json
/// { "database": { "file": "policy.db" }, "table_name": "casbin_rule" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterOptions {
    /// Database location.
    pub database: Database,
    /// Policy table name.
    pub table_name: String,
    /// Create the table on `open` if it does not exist.
    pub auto_create_table: bool,
    /// How long a statement waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            database: Database::Memory,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            auto_create_table: true,
            busy_timeout_ms: 5_000,
        }
    }
}

impl AdapterOptions {
    /// Options for an in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Options for a database file.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            database: Database::File(path.into()),
            ..Self::default()
        }
    }

    /// Sets the table name.
    #[must_use]
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// Sets whether `open` creates the table.
    #[must_use]
    pub const fn with_auto_create_table(mut self, enabled: bool) -> Self {
        self.auto_create_table = enabled;
        self
    }

    /// Sets the busy timeout.
    #[must_use]
    pub const fn with_busy_timeout_ms(mut self, millis: u64) -> Self {
        self.busy_timeout_ms = millis;
        self
    }

    /// Loads options from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// names an invalid table.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| IoError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let options: Self = serde_json::from_str(&text)?;
        options.validate()?;
        Ok(options)
    }

    /// Checks the options before they are used to open a connection.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the table name is not a plain identifier.
    pub fn validate(&self) -> Result<()> {
        validate_table_name(&self.table_name)?;
        if let Database::File(path) = &self.database
            && path.as_os_str().is_empty()
        {
            return Err(Error::config("database path is empty"));
        }
        Ok(())
    }

    /// Returns the database file path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.database {
            Database::Memory => None,
            Database::File(path) => Some(path),
        }
    }
}
