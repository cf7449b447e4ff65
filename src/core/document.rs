use super::error::QueryBuildError;
use super::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contract every cached and queried entity implements.
///
/// A document has a stable unique id, belongs to exactly one partition (the
/// signed-in user) and carries a last-updated timestamp. `field` exposes the
/// named fields predicates and sort keys read.
pub trait Document: Clone + Send + Sync + 'static {
    /// Logical collection name, used in logs and error messages.
    const COLLECTION: &'static str;

    /// Field holding the owning partition key.
    const PARTITION_FIELD: &'static str = "owner_id";

    const ID_FIELD: &'static str = "id";

    /// Field holding the last-updated timestamp; top-up compares against it.
    const UPDATED_FIELD: &'static str = "updated_at";

    fn id(&self) -> &str;

    fn partition_key(&self) -> &str;

    fn updated_at(&self) -> DateTime<Utc>;

    /// Returns the value of a named field, or `None` if the document has no
    /// such field.
    fn field(&self, name: &str) -> Option<Value>;

    /// Resolves the common fields first and defers the rest to `field`.
    fn value_of(&self, name: &str) -> Option<Value> {
        if name == Self::ID_FIELD {
            Some(Value::from(self.id()))
        } else if name == Self::PARTITION_FIELD {
            Some(Value::from(self.partition_key()))
        } else if name == Self::UPDATED_FIELD {
            Some(Value::from(self.updated_at()))
        } else {
            self.field(name)
        }
    }
}

/// The scope every query is restricted to.
///
/// Cannot be empty; constructing one is the only way to get a query past
/// the predicate builder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartitionKey(String);

impl PartitionKey {
    pub fn new(key: impl Into<String>) -> Result<Self, QueryBuildError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(QueryBuildError::EmptyPartitionKey);
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PartitionKey {
    type Error = QueryBuildError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PartitionKey> for String {
    fn from(key: PartitionKey) -> Self {
        key.0
    }
}

impl AsRef<str> for PartitionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_key_rejects_blank() {
        assert_eq!(
            PartitionKey::new("   "),
            Err(QueryBuildError::EmptyPartitionKey)
        );
        assert_eq!(PartitionKey::new("user-1").unwrap().as_str(), "user-1");
    }

    #[test]
    fn test_partition_key_deserialize_validates() {
        let parsed: std::result::Result<PartitionKey, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
        let parsed: PartitionKey = serde_json::from_str("\"u\"").unwrap();
        assert_eq!(parsed.as_str(), "u");
    }
}
