//! Query filters for store lookups and conditional updates.
//!
//! Only equality and conjunction exist: that is the entire query
//! vocabulary the coordination protocol needs (`locked == false`,
//! `lockTimestamp == <observed>`, and so on).

use crate::document::{Document, Value};

/// A predicate over a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Matches documents whose field equals the given value.
    Eq { field: String, value: Value },
    /// Matches documents satisfying every inner filter.
    And(Vec<Filter>),
}

impl Filter {
    /// Combines this filter with another one conjunctively.
    pub fn and(self, other: Filter) -> Filter {
        match self {
            Filter::And(mut filters) => {
                filters.push(other);
                Filter::And(filters)
            }
            filter => Filter::And(vec![filter, other]),
        }
    }

    /// Evaluates the filter against a document.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => document.get(field) == Some(value),
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
        }
    }
}

/// A filter that matches every document in a collection.
pub fn all() -> Filter {
    Filter::All
}

/// Starts a field-scoped filter, e.g. `field("locked").eq(false)`.
pub fn field(name: &str) -> FieldFilter {
    FieldFilter {
        field: name.to_string(),
    }
}

/// Intermediate builder returned by [`field`].
pub struct FieldFilter {
    field: String,
}

impl FieldFilter {
    pub fn eq(self, value: impl Into<Value>) -> Filter {
        Filter::Eq {
            field: self.field,
            value: value.into(),
        }
    }
}
