//! Adapter trait definition.
//!
//! Defines the interface the rule engine drives to persist and restore its
//! policy, enabling pluggable storage backends.

use crate::core::{Filter, PolicySink, PolicySource};
use crate::error::Result;

/// Persistent policy storage as seen by the rule engine.
///
/// Every operation fails with [`crate::Error::NotOpen`] unless the adapter
/// is open. Rule tuples hold at most [`crate::MAX_FIELDS`] values.
pub trait Adapter {
    /// Feeds every stored rule to `sink` as a policy line.
    ///
    /// Line order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn load_policy(&self, sink: &mut dyn PolicySink) -> Result<()>;

    /// Feeds the rules matching `filter` to `sink` and marks the adapter filtered.
    ///
    /// Patterns are ORed across all policy types. An empty pattern entry
    /// matches any value at that position.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is too long or the query fails.
    fn load_filtered_policy(&mut self, sink: &mut dyn PolicySink, filter: &Filter) -> Result<()>;

    /// Returns true once a filtered load has succeeded.
    fn is_filtered(&self) -> bool;

    /// Replaces the stored policy with every rule of `model`.
    ///
    /// Runs as one transaction: on failure the table is left as it was.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule is too long or any statement fails.
    fn save_policy(&mut self, model: &dyn PolicySource) -> Result<()>;

    /// Inserts one rule. Duplicates are not checked.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is too long or the insert fails.
    fn add_policy(&mut self, ptype: &str, rule: &[String]) -> Result<()>;

    /// Inserts all `rules` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule is too long or any insert fails; nothing
    /// is inserted in that case.
    fn add_policies(&mut self, ptype: &str, rules: &[Vec<String>]) -> Result<()>;

    /// Deletes every row exactly matching `rule`, returning how many were removed.
    ///
    /// Fields beyond the rule's length must be unset in the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is too long or the delete fails.
    fn remove_policy(&mut self, ptype: &str, rule: &[String]) -> Result<usize>;

    /// Applies [`Adapter::remove_policy`] for each rule in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule is too long or any delete fails; nothing
    /// is deleted in that case.
    fn remove_policies(&mut self, ptype: &str, rules: &[Vec<String>]) -> Result<usize>;

    /// Deletes rows of `ptype` whose fields starting at `field_index` match
    /// `field_values`. Empty values are wildcards.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidRange`] if `field_index + field_values.len()`
    /// exceeds the field capacity, or an error if the delete fails.
    fn remove_filtered_policy(
        &mut self,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<usize>;
}
