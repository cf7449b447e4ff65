// ============================================================================
// src/query/ordering.rs - Sort keys over documents
// ============================================================================
//
// Multiple keys compose lexicographically; the document id is the final
// ascending tie-break so every ordering is total and cursors are stable.
// Missing fields sort as NULL.
//
// ============================================================================

use super::predicate::Predicate;
use crate::core::{Document, Value};
use std::cmp::Ordering;

/// A single sort key (one `orderBy` clause).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn new(field: impl Into<String>, descending: bool) -> Self {
        Self {
            field: field.into(),
            descending,
        }
    }

    /// Collects the `orderBy` clauses of a predicate list, in order.
    pub fn from_predicates(predicates: &[Predicate]) -> Vec<SortKey> {
        predicates
            .iter()
            .filter_map(|p| match p {
                Predicate::OrderBy { field, descending } => Some(SortKey::new(field.clone(), *descending)),
                _ => None,
            })
            .collect()
    }
}

/// Compares two documents under `keys`, falling back to their ids.
pub fn compare_documents<T: Document>(a: &T, b: &T, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let left = a.value_of(&key.field).unwrap_or(Value::Null);
        let right = b.value_of(&key.field).unwrap_or(Value::Null);
        let ord = left.sort_cmp(&right);
        let ord = if key.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.id().cmp(b.id())
}

/// Stable in-place sort of `items` under `keys`.
pub fn sort_documents<T: Document>(items: &mut [T], keys: &[SortKey]) {
    items.sort_by(|a, b| compare_documents(a, b, keys));
}
