//! Policy record mapping.
//!
//! Converts between rule tuples, table rows, and the textual policy lines
//! handed to the model loader.

use crate::core::predicate::{Column, Predicate};
use crate::error::{Error, Result};
use serde::Serialize;

/// Number of value columns (`v0`..`v5`) in the policy table.
pub const MAX_FIELDS: usize = 6;

/// A single policy row.
///
/// Field values are held in a fixed array with an explicit arity. Records
/// built from a rule always populate a contiguous prefix of the array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyRecord {
    /// Surrogate key (None until stored).
    pub id: Option<i64>,
    ptype: String,
    fields: [Option<String>; MAX_FIELDS],
    #[serde(skip)]
    arity: usize,
}

impl PolicyRecord {
    /// Builds a record from a policy type and an ordered rule tuple.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArity`] if more than [`MAX_FIELDS`] values are supplied.
    ///
    /// # Examples
    ///
    /// ```
    /// use rulestore::PolicyRecord;
    ///
    /// let record = PolicyRecord::from_rule("p", &["alice", "data1", "read"]).unwrap();
    /// assert_eq!(record.to_line(), "p, alice, data1, read");
    /// ```
    pub fn from_rule<S: AsRef<str>>(ptype: impl Into<String>, values: &[S]) -> Result<Self> {
        if values.len() > MAX_FIELDS {
            return Err(Error::InvalidArity {
                arity: values.len(),
                max: MAX_FIELDS,
            });
        }

        let mut fields: [Option<String>; MAX_FIELDS] = Default::default();
        for (slot, value) in fields.iter_mut().zip(values) {
            *slot = Some(value.as_ref().to_string());
        }

        Ok(Self {
            id: None,
            ptype: ptype.into(),
            fields,
            arity: values.len(),
        })
    }

    /// Builds a record from raw column values as read from the table.
    ///
    /// Arity is one past the last non-null column.
    #[must_use]
    pub fn from_columns(id: i64, ptype: String, fields: [Option<String>; MAX_FIELDS]) -> Self {
        let arity = fields.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
        Self {
            id: Some(id),
            ptype,
            fields,
            arity,
        }
    }

    /// Returns the policy type.
    #[must_use]
    pub fn ptype(&self) -> &str {
        &self.ptype
    }

    /// Returns the number of populated fields.
    #[must_use]
    pub const fn arity(&self) -> usize {
        self.arity
    }

    /// Returns the value at position `index`, if set.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).and_then(|f| f.as_deref())
    }

    /// Returns all six column values in order.
    #[must_use]
    pub const fn fields(&self) -> &[Option<String>; MAX_FIELDS] {
        &self.fields
    }

    /// Renders the record as a policy line: `"<ptype>, <v0>, <v1>, ..."`.
    ///
    /// Null and empty fields are omitted.
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = self.ptype.clone();
        for value in self.fields.iter().flatten().filter(|v| !v.is_empty()) {
            line.push_str(", ");
            line.push_str(value);
        }
        line
    }

    /// Returns the populated fields as a rule tuple.
    #[must_use]
    pub fn to_rule(&self) -> Vec<String> {
        self.fields.iter().flatten().cloned().collect()
    }

    /// Predicate matching rows identical to this record on every column but `id`.
    ///
    /// Unset fields must be NULL in the stored row.
    #[must_use]
    pub fn exact_predicate(&self) -> Predicate {
        Column::FIELDS.iter().zip(&self.fields).fold(
            Predicate::for_ptype(&self.ptype),
            |pred, (&column, value)| match value {
                Some(v) => pred.equals(column, v.as_str()),
                None => pred.is_null(column),
            },
        )
    }
}

/// Builds a positional filter predicate.
///
/// `pattern[i]` constrains column `v{offset + i}`; empty entries are
/// wildcards and add no constraint.
///
/// # Errors
///
/// Returns [`Error::InvalidRange`] if `offset + pattern.len()` exceeds [`MAX_FIELDS`].
pub fn to_filter_predicate<S: AsRef<str>>(
    ptype: &str,
    offset: usize,
    pattern: &[S],
) -> Result<Predicate> {
    if offset.saturating_add(pattern.len()) > MAX_FIELDS {
        return Err(Error::InvalidRange {
            field_index: offset,
            count: pattern.len(),
            max: MAX_FIELDS,
        });
    }

    Ok(Column::FIELDS
        .iter()
        .skip(offset)
        .zip(pattern)
        .filter(|(_, value)| !value.as_ref().is_empty())
        .fold(Predicate::for_ptype(ptype), |pred, (&column, value)| {
            pred.equals(column, value.as_ref())
        }))
}
