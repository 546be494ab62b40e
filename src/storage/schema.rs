//! Database schema definitions.
//!
//! Contains the policy table DDL. The table name is caller-configurable, so
//! statements are produced per table rather than held as constants.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Default policy table name.
pub const DEFAULT_TABLE_NAME: &str = "casbin_rule";

static IDENTIFIER: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$"));

/// Checks that `name` is usable as an unquoted SQL identifier.
///
/// # Errors
///
/// Returns a configuration error if the name is empty or contains anything
/// other than ASCII letters, digits, and underscores.
pub fn validate_table_name(name: &str) -> Result<()> {
    let pattern = IDENTIFIER
        .as_ref()
        .map_err(|e| Error::config(format!("identifier pattern: {e}")))?;

    if pattern.is_match(name) {
        Ok(())
    } else {
        Err(Error::config(format!("invalid table name: {name:?}")))
    }
}

/// SQL that creates the policy table and its lookup index if missing.
#[must_use]
pub fn create_table_sql(table: &str) -> String {
    format!(
        r"
CREATE TABLE IF NOT EXISTS {table} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ptype TEXT NOT NULL,
    v0 TEXT,
    v1 TEXT,
    v2 TEXT,
    v3 TEXT,
    v4 TEXT,
    v5 TEXT
);

-- Equality lookups filter on ptype and the leading fields
CREATE INDEX IF NOT EXISTS idx_{table}_ptype ON {table}(ptype, v0, v1);
"
    )
}

/// SQL that inserts one policy row.
#[must_use]
pub fn insert_sql(table: &str) -> String {
    format!("INSERT INTO {table} (ptype, v0, v1, v2, v3, v4, v5) VALUES (?, ?, ?, ?, ?, ?, ?)")
}

/// SQL that selects policy rows, optionally restricted by a WHERE fragment.
#[must_use]
pub fn select_sql(table: &str, condition: Option<&str>) -> String {
    let base = format!("SELECT id, ptype, v0, v1, v2, v3, v4, v5 FROM {table}");
    match condition {
        Some(cond) => format!("{base} WHERE {cond}"),
        None => base,
    }
}

/// SQL that deletes policy rows, optionally restricted by a WHERE fragment.
#[must_use]
pub fn delete_sql(table: &str, condition: Option<&str>) -> String {
    match condition {
        Some(cond) => format!("DELETE FROM {table} WHERE {cond}"),
        None => format!("DELETE FROM {table}"),
    }
}
