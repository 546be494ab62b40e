//! Contract with the rule-evaluation engine.
//!
//! The adapter feeds loaded rules into a [`PolicySink`] one line at a time
//! and reads the full rule set for a save from a [`PolicySource`].
//! [`PolicyModel`] is a plain in-memory implementation of both.

use serde::Serialize;
use std::collections::BTreeMap;

/// Rule family a policy type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RuleFamily {
    /// Permission rules (`p`, `p2`, ...).
    Primary,
    /// Grouping / role-inheritance rules (`g`, `g2`, ...).
    Grouping,
}

impl RuleFamily {
    /// Both families, in save order.
    pub const ALL: [Self; 2] = [Self::Primary, Self::Grouping];

    /// Classifies a policy type by its leading letter.
    #[must_use]
    pub fn of(ptype: &str) -> Self {
        if ptype.starts_with('g') {
            Self::Grouping
        } else {
            Self::Primary
        }
    }
}

/// Receives policy lines during a load.
pub trait PolicySink {
    /// Accepts one `"<ptype>, <field>, ..."` line.
    fn receive(&mut self, line: &str);
}

/// Supplies the complete rule set during a save.
pub trait PolicySource {
    /// Returns the rules of `family`, keyed by policy type.
    fn rules_by_type(&self, family: RuleFamily) -> BTreeMap<&str, &[Vec<String>]>;
}

impl PolicySink for Vec<String> {
    fn receive(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

impl<F: FnMut(&str)> PolicySink for F {
    fn receive(&mut self, line: &str) {
        self(line);
    }
}

/// Splits a policy line into its policy type and rule tuple.
///
/// Returns `None` for blank lines and `#` comments.
#[must_use]
pub fn parse_policy_line(line: &str) -> Option<(String, Vec<String>)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut tokens = line.split(',').map(str::trim);
    let ptype = tokens.next()?.to_string();
    if ptype.is_empty() {
        return None;
    }
    Some((ptype, tokens.map(str::to_string).collect()))
}

/// In-memory policy model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyModel {
    primary: BTreeMap<String, Vec<Vec<String>>>,
    grouping: BTreeMap<String, Vec<Vec<String>>>,
}

impl PolicyModel {
    /// Creates an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a policy file body, one rule per line.
    #[must_use]
    pub fn from_lines(text: &str) -> Self {
        let mut model = Self::new();
        for line in text.lines() {
            model.receive(line);
        }
        model
    }

    /// Appends a rule.
    pub fn add_rule<I, S>(&mut self, ptype: &str, rule: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.family_mut(RuleFamily::of(ptype))
            .entry(ptype.to_string())
            .or_default()
            .push(rule.into_iter().map(Into::into).collect());
    }

    /// Returns the rules stored for `ptype`.
    #[must_use]
    pub fn rules(&self, ptype: &str) -> &[Vec<String>] {
        self.family(RuleFamily::of(ptype))
            .get(ptype)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns true if `ptype` holds exactly this rule at least once.
    #[must_use]
    pub fn has_rule<S: AsRef<str>>(&self, ptype: &str, rule: &[S]) -> bool {
        self.rules(ptype).iter().any(|r| {
            r.len() == rule.len() && r.iter().zip(rule).all(|(a, b)| a == b.as_ref())
        })
    }

    /// Total number of rules across both families.
    #[must_use]
    pub fn len(&self) -> usize {
        self.primary
            .values()
            .chain(self.grouping.values())
            .map(Vec::len)
            .sum()
    }

    /// Returns true if the model holds no rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders every rule as a policy line, primary family first.
    #[must_use]
    pub fn to_lines(&self) -> Vec<String> {
        RuleFamily::ALL
            .iter()
            .flat_map(|family| self.family(*family))
            .flat_map(|(ptype, rules)| {
                rules.iter().map(move |rule| {
                    std::iter::once(ptype.as_str())
                        .chain(rule.iter().map(String::as_str))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
            })
            .collect()
    }

    fn family(&self, family: RuleFamily) -> &BTreeMap<String, Vec<Vec<String>>> {
        match family {
            RuleFamily::Primary => &self.primary,
            RuleFamily::Grouping => &self.grouping,
        }
    }

    fn family_mut(&mut self, family: RuleFamily) -> &mut BTreeMap<String, Vec<Vec<String>>> {
        match family {
            RuleFamily::Primary => &mut self.primary,
            RuleFamily::Grouping => &mut self.grouping,
        }
    }
}

impl PolicySink for PolicyModel {
    fn receive(&mut self, line: &str) {
        match parse_policy_line(line) {
            Some((ptype, rule)) => self.add_rule(&ptype, rule),
            None => tracing::trace!(line, "skipping non-rule line"),
        }
    }
}

impl PolicySource for PolicyModel {
    fn rules_by_type(&self, family: RuleFamily) -> BTreeMap<&str, &[Vec<String>]> {
        self.family(family)
            .iter()
            .map(|(ptype, rules)| (ptype.as_str(), rules.as_slice()))
            .collect()
    }
}
