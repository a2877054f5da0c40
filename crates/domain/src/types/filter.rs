//! ERPNext list filters.
//!
//! A filter is an ordered list of `(field, operator, value)` triples. The
//! triples are AND-ed, except for the single "or" grouping used by free-text
//! search, which serialises as `["or", [..], [..]]`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Comparison operator understood by the ERP list API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "like")]
    Like,
}

impl FilterOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Like => "like",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(field, operator, value)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self { field: field.into(), op, value: value.into() }
    }

    fn to_json(&self) -> Value {
        json!([self.field, self.op.as_str(), self.value])
    }
}

/// Ordered set of conditions sent as the `filters` query parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    conditions: Vec<Condition>,
    any_of: bool,
}

impl QueryFilter {
    /// Empty filter; conditions added to it are combined with AND.
    pub fn new() -> Self {
        Self::default()
    }

    /// Substring search over several fields, combined with OR. Case handling
    /// follows the ERP's `like` operator.
    pub fn search(fields: &[&str], term: &str) -> Self {
        let pattern = format!("%{term}%");
        Self {
            conditions: fields
                .iter()
                .map(|field| Condition::new(*field, FilterOp::Like, pattern.clone()))
                .collect(),
            any_of: true,
        }
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::new(field, op, value));
        self
    }

    /// Add the condition only when a value is supplied.
    #[must_use]
    pub fn with_opt<V: Into<Value>>(
        self,
        field: impl Into<String>,
        op: FilterOp,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(value) => self.with(field, op, value),
            None => self,
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_any_of(&self) -> bool {
        self.any_of
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// JSON form expected by the ERP `filters` parameter.
    pub fn to_json(&self) -> Value {
        let triples = self.conditions.iter().map(Condition::to_json);
        if self.any_of {
            Value::Array(std::iter::once(Value::from("or")).chain(triples).collect())
        } else {
            Value::Array(triples.collect())
        }
    }
}
