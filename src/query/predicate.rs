use crate::core::{Document, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// One clause of a remote query: a filter, an ordering or a limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Equals { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    NotIn { field: String, values: Vec<Value> },
    ArrayContains { field: String, value: Value },
    ArrayContainsAny { field: String, values: Vec<Value> },
    LessThan { field: String, value: Value },
    GreaterThan { field: String, value: Value },
    LessOrEqual { field: String, value: Value },
    GreaterOrEqual { field: String, value: Value },
    OrderBy { field: String, descending: bool },
    Limit(usize),
    IsNull { field: String },
    IsNotNull { field: String },
}

impl Predicate {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::NotIn {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ArrayContains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn array_contains_any<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::ArrayContainsAny {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::LessThan {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn greater_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::GreaterThan {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn less_or_equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::LessOrEqual {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn greater_or_equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::GreaterOrEqual {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn order_by(field: impl Into<String>, descending: bool) -> Self {
        Self::OrderBy {
            field: field.into(),
            descending,
        }
    }

    pub fn limit(n: usize) -> Self {
        Self::Limit(n)
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull {
            field: field.into(),
        }
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::IsNotNull {
            field: field.into(),
        }
    }

    /// Field the clause reads; `None` for `Limit`.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Equals { field, .. }
            | Self::In { field, .. }
            | Self::NotIn { field, .. }
            | Self::ArrayContains { field, .. }
            | Self::ArrayContainsAny { field, .. }
            | Self::LessThan { field, .. }
            | Self::GreaterThan { field, .. }
            | Self::LessOrEqual { field, .. }
            | Self::GreaterOrEqual { field, .. }
            | Self::OrderBy { field, .. }
            | Self::IsNull { field }
            | Self::IsNotNull { field } => Some(field),
            Self::Limit(_) => None,
        }
    }

    /// Value list carried by the set operators.
    pub fn set_values(&self) -> Option<&[Value]> {
        match self {
            Self::In { values, .. }
            | Self::NotIn { values, .. }
            | Self::ArrayContainsAny { values, .. } => Some(values),
            _ => None,
        }
    }

    pub fn is_filter(&self) -> bool {
        !matches!(self, Self::OrderBy { .. } | Self::Limit(_))
    }

    /// Evaluates a filter clause against a document. Ordering and limit
    /// clauses always match.
    pub fn matches<T: Document>(&self, doc: &T) -> bool {
        let Some(name) = self.field() else {
            return true;
        };
        let actual = doc.value_of(name);

        match self {
            Self::Equals { value, .. } => actual.is_some_and(|a| a == *value),
            Self::In { values, .. } => actual.is_some_and(|a| values.contains(&a)),
            Self::NotIn { values, .. } => match actual {
                // absent or null fields never satisfy `not in`
                Some(a) if !a.is_null() => !values.contains(&a),
                _ => false,
            },
            Self::ArrayContains { value, .. } => actual
                .as_ref()
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
            Self::ArrayContainsAny { values, .. } => actual
                .as_ref()
                .and_then(Value::as_array)
                .is_some_and(|items| items.iter().any(|item| values.contains(item))),
            Self::LessThan { value, .. } => compares(actual, value, |o| o == Ordering::Less),
            Self::GreaterThan { value, .. } => compares(actual, value, |o| o == Ordering::Greater),
            Self::LessOrEqual { value, .. } => compares(actual, value, |o| o != Ordering::Greater),
            Self::GreaterOrEqual { value, .. } => compares(actual, value, |o| o != Ordering::Less),
            Self::IsNull { .. } => actual.is_none_or(|a| a.is_null()),
            Self::IsNotNull { .. } => actual.is_some_and(|a| !a.is_null()),
            Self::OrderBy { .. } | Self::Limit(_) => true,
        }
    }
}

fn compares(actual: Option<Value>, expected: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match actual {
        Some(a) if !a.is_null() => a.compare(expected).is_some_and(accept),
        _ => false,
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |values: &[Value]| {
            values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Self::Equals { field, value } => write!(f, "{} == {}", field, value),
            Self::In { field, values } => write!(f, "{} in [{}]", field, list(values)),
            Self::NotIn { field, values } => write!(f, "{} not in [{}]", field, list(values)),
            Self::ArrayContains { field, value } => write!(f, "{} contains {}", field, value),
            Self::ArrayContainsAny { field, values } => {
                write!(f, "{} contains any [{}]", field, list(values))
            }
            Self::LessThan { field, value } => write!(f, "{} < {}", field, value),
            Self::GreaterThan { field, value } => write!(f, "{} > {}", field, value),
            Self::LessOrEqual { field, value } => write!(f, "{} <= {}", field, value),
            Self::GreaterOrEqual { field, value } => write!(f, "{} >= {}", field, value),
            Self::OrderBy { field, descending } => {
                write!(f, "order by {} {}", field, if *descending { "desc" } else { "asc" })
            }
            Self::Limit(n) => write!(f, "limit {}", n),
            Self::IsNull { field } => write!(f, "{} is null", field),
            Self::IsNotNull { field } => write!(f, "{} is not null", field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    #[derive(Debug, Clone)]
    struct Card {
        id: String,
        tags: Vec<String>,
        ease: Option<f64>,
        reviews: i64,
    }

    impl Document for Card {
        const COLLECTION: &'static str = "cards";

        fn id(&self) -> &str {
            &self.id
        }

        fn partition_key(&self) -> &str {
            "user"
        }

        fn updated_at(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(100, 0).unwrap()
        }

        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "tags" => Some(Value::from(self.tags.clone())),
                "ease" => Some(Value::from(self.ease)),
                "reviews" => Some(Value::from(self.reviews)),
                _ => None,
            }
        }
    }

    fn card() -> Card {
        Card {
            id: "c1".into(),
            tags: vec!["verbs".into(), "french".into()],
            ease: None,
            reviews: 4,
        }
    }

    #[test]
    fn test_comparison_predicates() {
        let c = card();
        assert!(Predicate::greater_than("reviews", 3i64).matches(&c));
        assert!(!Predicate::greater_than("reviews", 4i64).matches(&c));
        assert!(Predicate::greater_or_equal("reviews", 4i64).matches(&c));
        assert!(Predicate::less_or_equal("reviews", 4i64).matches(&c));
        assert!(!Predicate::less_than("reviews", "4").matches(&c));
    }

    #[test]
    fn test_set_and_array_predicates() {
        let c = card();
        assert!(Predicate::is_in("id", ["c0", "c1"]).matches(&c));
        assert!(!Predicate::not_in("id", ["c1"]).matches(&c));
        assert!(Predicate::array_contains("tags", "french").matches(&c));
        assert!(!Predicate::array_contains("reviews", 4i64).matches(&c));
        assert!(Predicate::array_contains_any("tags", ["german", "verbs"]).matches(&c));
    }

    #[test]
    fn test_null_predicates() {
        let c = card();
        assert!(Predicate::is_null("ease").matches(&c));
        assert!(Predicate::is_null("missing").matches(&c));
        assert!(Predicate::is_not_null("reviews").matches(&c));
        assert!(!Predicate::not_in("ease", [1.0]).matches(&c));
    }

    #[test]
    fn test_common_fields_resolve_through_document() {
        let c = card();
        assert!(Predicate::equals("owner_id", "user").matches(&c));
        assert!(Predicate::greater_than("updated_at", Utc.timestamp_opt(99, 0).unwrap()).matches(&c));
        assert!(Predicate::order_by("updated_at", true).matches(&c));
    }
}
