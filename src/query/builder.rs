use super::predicate::Predicate;
use crate::config::EntityConfig;
use crate::core::{Document, PartitionKey, QueryBuildError};

/// Static query facts for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySchema {
    pub collection: &'static str,
    pub partition_field: &'static str,
    pub id_field: &'static str,
    pub updated_field: &'static str,
    pub order_field: String,
    pub order_descending: bool,
    /// Default limit, and the hard ceiling for limits and value sets
    pub page_size: usize,
}

impl QuerySchema {
    pub fn for_document<T: Document>(config: &EntityConfig, page_size: usize) -> Self {
        Self {
            collection: T::COLLECTION,
            partition_field: T::PARTITION_FIELD,
            id_field: T::ID_FIELD,
            updated_field: T::UPDATED_FIELD,
            order_field: config.order.field.clone(),
            order_descending: config.order.descending,
            page_size,
        }
    }

    pub fn builder(&self) -> QueryPredicateBuilder<'_> {
        QueryPredicateBuilder::new(self)
    }
}

/// A fully specified, partition-scoped query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    predicates: Vec<Predicate>,
}

impl QueryDescriptor {
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn into_predicates(self) -> Vec<Predicate> {
        self.predicates
    }

    /// Effective page size; the builder guarantees exactly one limit.
    pub fn limit(&self) -> usize {
        self.predicates
            .iter()
            .find_map(|p| match p {
                Predicate::Limit(n) => Some(*n),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Same query with its limit replaced.
    pub fn with_limit(&self, limit: usize) -> Self {
        let predicates = self
            .predicates
            .iter()
            .map(|p| match p {
                Predicate::Limit(_) => Predicate::Limit(limit),
                other => other.clone(),
            })
            .collect();
        Self { predicates }
    }
}

/// Turns caller predicates plus a partition key into a [`QueryDescriptor`].
///
/// The partition equality clause is always appended, so a caller clause on
/// the partition field can only narrow the result, never widen it. When the
/// caller supplies no ordering the natural `order_field` is appended; when
/// it supplies no limit the page size is.
pub struct QueryPredicateBuilder<'a> {
    schema: &'a QuerySchema,
    partition: Option<PartitionKey>,
    predicates: Vec<Predicate>,
}

impl<'a> QueryPredicateBuilder<'a> {
    pub fn new(schema: &'a QuerySchema) -> Self {
        Self {
            schema,
            partition: None,
            predicates: Vec::new(),
        }
    }

    pub fn partition(mut self, key: &PartitionKey) -> Self {
        self.partition = Some(key.clone());
        self
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn build(self) -> Result<QueryDescriptor, QueryBuildError> {
        let schema = self.schema;
        let partition = self
            .partition
            .ok_or_else(|| QueryBuildError::MissingPartitionKey(schema.collection.to_string()))?;

        let mut limit_seen = false;
        let mut order_seen = false;

        // keep only the first limit so the descriptor has exactly one
        let mut validated = Vec::with_capacity(self.predicates.len() + 3);
        for predicate in self.predicates {
            match &predicate {
                Predicate::Limit(n) => {
                    if *n == 0 || *n > schema.page_size {
                        return Err(QueryBuildError::LimitOutOfRange {
                            limit: *n,
                            ceiling: schema.page_size,
                        });
                    }
                    if limit_seen {
                        continue;
                    }
                    limit_seen = true;
                }
                Predicate::OrderBy { .. } => order_seen = true,
                _ => {}
            }
            if let Some(values) = predicate.set_values() {
                if values.len() > schema.page_size {
                    return Err(QueryBuildError::SetTooLarge {
                        field: predicate.field().unwrap_or_default().to_string(),
                        len: values.len(),
                        ceiling: schema.page_size,
                    });
                }
            }
            validated.push(predicate);
        }

        validated.push(Predicate::equals(
            schema.partition_field,
            partition.as_str(),
        ));
        if !order_seen {
            validated.push(Predicate::order_by(
                schema.order_field.clone(),
                schema.order_descending,
            ));
        }
        if !limit_seen {
            validated.push(Predicate::limit(schema.page_size));
        }

        Ok(QueryDescriptor {
            predicates: validated,
        })
    }
}
