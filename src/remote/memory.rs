// ============================================================================
// src/remote/memory.rs - In-memory document store
// ============================================================================
//
// Behaves like the hosted backend for everything the data-access core
// relies on:
// - queries must carry the partition equality clause for the supplied key
//   (otherwise PermissionDenied, like the backend's security rules)
// - limits and value sets above the ceiling are rejected (InvalidArgument)
// - continuation resumes by sort key, so a cursor document that no longer
//   matches the filters still positions the scan
//
// Faults can be queued to fail upcoming calls, and every call is counted
// in a `RequestLog` so tests can assert on batching.
//
// ============================================================================

use super::{BackendCode, BackendError, Page, RemoteStore};
use crate::core::{Document, PartitionKey, Value};
use crate::model::{Deck, Flashcard, SessionSummary, Subdeck};
use crate::query::{Predicate, SortKey, compare_documents};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::{Mutex, RwLock};
use tracing::{Level, event};

/// Counters of the calls a store has served.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLog {
    pub queries: usize,
    pub point_lookups: usize,
    pub batch_lookups: usize,
    /// Largest value list seen in a set predicate or batch lookup
    pub largest_set: usize,
    /// Largest limit seen on a query
    pub largest_limit: usize,
}

pub struct InMemoryRemoteStore<T> {
    documents: RwLock<BTreeMap<String, T>>,
    ceiling: usize,
    faults: Mutex<VecDeque<BackendError>>,
    log: Mutex<RequestLog>,
}

impl<T: Document> InMemoryRemoteStore<T> {
    /// Creates an empty store whose limits and value sets are capped at `ceiling`.
    pub fn new(ceiling: usize) -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            ceiling,
            faults: Mutex::new(VecDeque::new()),
            log: Mutex::new(RequestLog::default()),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Inserts or replaces a document (last write wins).
    pub async fn put(&self, doc: T) {
        self.documents.write().await.insert(doc.id().to_string(), doc);
    }

    pub async fn put_many(&self, docs: impl IntoIterator<Item = T>) {
        let mut documents = self.documents.write().await;
        for doc in docs {
            documents.insert(doc.id().to_string(), doc);
        }
    }

    pub async fn delete(&self, id: &str) -> bool {
        self.documents.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Fails the next call (of any kind) with `err`. Faults queue up.
    pub async fn fail_next(&self, err: BackendError) {
        self.faults.lock().await.push_back(err);
    }

    pub async fn request_log(&self) -> RequestLog {
        self.log.lock().await.clone()
    }

    pub async fn reset_request_log(&self) {
        *self.log.lock().await = RequestLog::default();
    }

    async fn take_fault(&self) -> Result<(), BackendError> {
        match self.faults.lock().await.pop_front() {
            Some(err) => {
                event!(Level::DEBUG, code = %err.code, "injected backend fault");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn check_scope(&self, predicates: &[Predicate], partition_key: &PartitionKey) -> Result<(), BackendError> {
        let expected = Value::from(partition_key.as_str());
        let scoped = predicates.iter().any(|p| match p {
            Predicate::Equals { field, value } => field == T::PARTITION_FIELD && *value == expected,
            _ => false,
        });
        if scoped {
            Ok(())
        } else {
            Err(BackendError::new(
                BackendCode::PermissionDenied,
                format!("query on '{}' is not scoped to '{}'", T::COLLECTION, partition_key),
            ))
        }
    }

    fn check_ceiling(&self, predicates: &[Predicate]) -> Result<usize, BackendError> {
        let mut limit = None;
        for predicate in predicates {
            if let Predicate::Limit(n) = predicate {
                if *n > self.ceiling {
                    return Err(BackendError::new(
                        BackendCode::InvalidArgument,
                        format!("limit {} exceeds ceiling {}", n, self.ceiling),
                    ));
                }
                limit.get_or_insert(*n);
            }
            if let Some(values) = predicate.set_values() {
                if values.len() > self.ceiling {
                    return Err(BackendError::new(
                        BackendCode::InvalidArgument,
                        format!("{} values exceed ceiling {}", values.len(), self.ceiling),
                    ));
                }
            }
        }
        Ok(limit.unwrap_or(self.ceiling))
    }
}

#[async_trait]
impl<T: Document> RemoteStore<T> for InMemoryRemoteStore<T> {
    async fn query(
        &self,
        predicates: &[Predicate],
        partition_key: &PartitionKey,
        start_after: Option<&T>,
    ) -> Result<Page<T>, BackendError> {
        {
            let mut log = self.log.lock().await;
            log.queries += 1;
            for predicate in predicates {
                match predicate {
                    Predicate::Limit(n) => log.largest_limit = log.largest_limit.max(*n),
                    other => {
                        if let Some(values) = other.set_values() {
                            log.largest_set = log.largest_set.max(values.len());
                        }
                    }
                }
            }
        }
        self.take_fault().await?;
        self.check_scope(predicates, partition_key)?;
        let limit = self.check_ceiling(predicates)?;
        let keys = SortKey::from_predicates(predicates);

        let documents = self.documents.read().await;
        let mut matched: Vec<T> = documents
            .values()
            .filter(|doc| doc.partition_key() == partition_key.as_str())
            .filter(|doc| predicates.iter().all(|p| p.matches(*doc)))
            .filter(|doc| match start_after {
                Some(cursor) => compare_documents(*doc, cursor, &keys) == Ordering::Greater,
                None => true,
            })
            .cloned()
            .collect();
        drop(documents);

        matched.sort_by(|a, b| compare_documents(a, b, &keys));
        matched.truncate(limit);
        Ok(Page::new(matched, limit))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<T>, BackendError> {
        self.log.lock().await.point_lookups += 1;
        self.take_fault().await?;
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<T>, BackendError> {
        {
            let mut log = self.log.lock().await;
            log.batch_lookups += 1;
            log.largest_set = log.largest_set.max(ids.len());
        }
        self.take_fault().await?;
        if ids.len() > self.ceiling {
            return Err(BackendError::new(
                BackendCode::InvalidArgument,
                format!("{} ids exceed ceiling {}", ids.len(), self.ceiling),
            ));
        }

        let documents = self.documents.read().await;
        // backend returns matches in storage order, not request order
        Ok(documents
            .values()
            .filter(|doc| ids.iter().any(|id| id == doc.id()))
            .cloned()
            .collect())
    }
}

/// One in-memory store per entity kind behind a single handle.
pub struct InMemoryBackend {
    pub decks: InMemoryRemoteStore<Deck>,
    pub subdecks: InMemoryRemoteStore<Subdeck>,
    pub flashcards: InMemoryRemoteStore<Flashcard>,
    pub session_summaries: InMemoryRemoteStore<SessionSummary>,
}

impl InMemoryBackend {
    pub fn new(ceiling: usize) -> Self {
        Self {
            decks: InMemoryRemoteStore::new(ceiling),
            subdecks: InMemoryRemoteStore::new(ceiling),
            flashcards: InMemoryRemoteStore::new(ceiling),
            session_summaries: InMemoryRemoteStore::new(ceiling),
        }
    }
}

macro_rules! delegate_remote_store {
    ($doc:ty, $field:ident) => {
        #[async_trait]
        impl RemoteStore<$doc> for InMemoryBackend {
            async fn query(
                &self,
                predicates: &[Predicate],
                partition_key: &PartitionKey,
                start_after: Option<&$doc>,
            ) -> Result<Page<$doc>, BackendError> {
                self.$field.query(predicates, partition_key, start_after).await
            }

            async fn get_by_id(&self, id: &str) -> Result<Option<$doc>, BackendError> {
                self.$field.get_by_id(id).await
            }

            async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<$doc>, BackendError> {
                self.$field.get_by_ids(ids).await
            }
        }
    };
}

delegate_remote_store!(Deck, decks);
delegate_remote_store!(Subdeck, subdecks);
delegate_remote_store!(Flashcard, flashcards);
delegate_remote_store!(SessionSummary, session_summaries);
