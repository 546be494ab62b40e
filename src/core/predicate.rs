//! WHERE-clause builder for policy rows.
//!
//! A [`Predicate`] is a conjunction of column constraints; [`AnyOf`] is a
//! disjunction of predicates. Both render to parameterized SQL so rule
//! values never end up in statement text.

use crate::core::record::MAX_FIELDS;

/// A column of the policy table that can be constrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// The `ptype` column.
    Ptype,
    /// `v0`.
    V0,
    /// `v1`.
    V1,
    /// `v2`.
    V2,
    /// `v3`.
    V3,
    /// `v4`.
    V4,
    /// `v5`.
    V5,
}

impl Column {
    /// The value columns in positional order.
    pub const FIELDS: [Self; MAX_FIELDS] =
        [Self::V0, Self::V1, Self::V2, Self::V3, Self::V4, Self::V5];

    /// Returns the value column at `index`, or `None` past `v5`.
    #[must_use]
    pub const fn field(index: usize) -> Option<Self> {
        if index < MAX_FIELDS {
            Some(Self::FIELDS[index])
        } else {
            None
        }
    }

    /// Returns the SQL column name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ptype => "ptype",
            Self::V0 => "v0",
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::V3 => "v3",
            Self::V4 => "v4",
            Self::V5 => "v5",
        }
    }
}

/// Constraint placed on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Column equals the value.
    Eq(String),
    /// Column is NULL.
    IsNull,
}

/// Conjunction of column constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    constraints: Vec<(Column, Constraint)>,
}

impl Predicate {
    /// Creates an empty predicate (matches every row).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            constraints: Vec::new(),
        }
    }

    /// Creates a predicate constraining only the policy type.
    #[must_use]
    pub fn for_ptype(ptype: impl Into<String>) -> Self {
        Self::new().equals(Column::Ptype, ptype)
    }

    /// Adds an equality constraint.
    #[must_use]
    pub fn equals(mut self, column: Column, value: impl Into<String>) -> Self {
        self.constraints.push((column, Constraint::Eq(value.into())));
        self
    }

    /// Adds an `IS NULL` constraint.
    #[must_use]
    pub fn is_null(mut self, column: Column) -> Self {
        self.constraints.push((column, Constraint::IsNull));
        self
    }

    /// Returns the constraints in insertion order.
    #[must_use]
    pub fn constraints(&self) -> &[(Column, Constraint)] {
        &self.constraints
    }

    /// Returns true if no constraint has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Renders the predicate, appending bound values to `params`.
    pub fn render(&self, params: &mut Vec<String>) -> String {
        if self.constraints.is_empty() {
            return "1 = 1".to_string();
        }

        self.constraints
            .iter()
            .map(|(column, constraint)| match constraint {
                Constraint::Eq(value) => {
                    params.push(value.clone());
                    format!("{} = ?", column.name())
                }
                Constraint::IsNull => format!("{} IS NULL", column.name()),
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Renders the predicate into a standalone SQL fragment and its parameters.
    #[must_use]
    pub fn to_sql(&self) -> (String, Vec<String>) {
        let mut params = Vec::new();
        let sql = self.render(&mut params);
        (sql, params)
    }
}

/// Disjunction of predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnyOf(Vec<Predicate>);

impl AnyOf {
    /// Creates an empty disjunction (matches no row).
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds a predicate to the disjunction.
    pub fn push(&mut self, predicate: Predicate) {
        self.0.push(predicate);
    }

    /// Number of predicates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the disjunction holds no predicate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the disjunction into a SQL fragment and its parameters.
    #[must_use]
    pub fn to_sql(&self) -> (String, Vec<String>) {
        if self.0.is_empty() {
            return ("0 = 1".to_string(), Vec::new());
        }

        let mut params = Vec::new();
        let sql = self
            .0
            .iter()
            .map(|p| format!("({})", p.render(&mut params)))
            .collect::<Vec<_>>()
            .join(" OR ");
        (sql, params)
    }
}

impl FromIterator<Predicate> for AnyOf {
    fn from_iter<I: IntoIterator<Item = Predicate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
