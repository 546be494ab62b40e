//! Core domain models for rulestore.
//!
//! This module contains the policy record mapper, the predicate builder,
//! load filters, and the model contract shared with the rule engine. These
//! are pure domain types with no I/O dependencies.

pub mod filter;
pub mod model;
pub mod predicate;
pub mod record;

pub use filter::Filter;
pub use model::{PolicyModel, PolicySink, PolicySource, RuleFamily, parse_policy_line};
pub use predicate::{AnyOf, Column, Constraint, Predicate};
pub use record::{MAX_FIELDS, PolicyRecord, to_filter_predicate};
