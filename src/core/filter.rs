//! Filters for partial policy loads.

use crate::core::predicate::AnyOf;
use crate::core::record::{MAX_FIELDS, to_filter_predicate};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maps a policy type to the positional patterns that select its rows.
///
/// An empty string inside a pattern matches any value at that position.
/// Serialized as a plain JSON object, e.g. `{"p": [["alice"], ["", "data2"]]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    patterns: BTreeMap<String, Vec<Vec<String>>>,
}

impl Filter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pattern for `ptype`.
    #[must_use]
    pub fn with<I, S>(mut self, ptype: impl Into<String>, pattern: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns
            .entry(ptype.into())
            .or_default()
            .push(pattern.into_iter().map(Into::into).collect());
        self
    }

    /// Returns true if no pattern has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.values().all(Vec::is_empty)
    }

    /// Iterates over `(ptype, patterns)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Vec<String>])> {
        self.patterns
            .iter()
            .map(|(ptype, patterns)| (ptype.as_str(), patterns.as_slice()))
    }

    /// Builds one predicate per pattern, ORed across all policy types.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArity`] if a pattern has more than [`MAX_FIELDS`] entries.
    pub fn to_predicates(&self) -> Result<AnyOf> {
        let mut any = AnyOf::new();
        for (ptype, patterns) in self.iter() {
            for pattern in patterns {
                if pattern.len() > MAX_FIELDS {
                    return Err(Error::InvalidArity {
                        arity: pattern.len(),
                        max: MAX_FIELDS,
                    });
                }
                any.push(to_filter_predicate(ptype, 0, pattern.as_slice())?);
            }
        }
        Ok(any)
    }
}
