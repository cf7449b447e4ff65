// ============================================================================
// src/executor/partitioned.rs - Partition-scoped query execution
// ============================================================================
//
// Every query passes through the predicate builder, so nothing reaches the
// store without the partition clause. No request exceeds the page size:
// range queries page at it, id sets are chunked at it. Cancellation is
// checked before each request, never during one. Backend failures are
// translated into `StoreError` and returned without retrying.
//
// ============================================================================

use super::cancel::CancelToken;
use crate::core::{Document, PartitionKey, Result, StoreError};
use crate::query::{Predicate, QueryDescriptor, QuerySchema, SortKey, sort_documents};
use crate::remote::{BackendError, Page, RemoteStore};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

pub struct PartitionedQueryExecutor<T, S: ?Sized> {
    store: Arc<S>,
    schema: QuerySchema,
    cancel: CancelToken,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S: ?Sized> Clone for PartitionedQueryExecutor<T, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            schema: self.schema.clone(),
            cancel: self.cancel.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, S> PartitionedQueryExecutor<T, S>
where
    T: Document,
    S: RemoteStore<T> + ?Sized,
{
    pub fn new(store: Arc<S>, schema: QuerySchema) -> Self {
        Self {
            store,
            schema,
            cancel: CancelToken::new(),
            _marker: PhantomData,
        }
    }

    /// Checks `token` between page and chunk requests.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn schema(&self) -> &QuerySchema {
        &self.schema
    }

    pub fn page_size(&self) -> usize {
        self.schema.page_size
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Runs the query page after page until a short page or `limit`.
    pub async fn fetch_all(
        &self,
        predicates: Vec<Predicate>,
        partition: &PartitionKey,
        limit: Option<usize>,
    ) -> Result<Vec<T>> {
        let span = info_span!(
            "executor.fetch_all",
            collection = %self.schema.collection,
            partition = %partition,
            limit = ?limit
        );
        async {
            let descriptor = self.build(predicates, partition)?;
            let page_size = descriptor.limit();
            let mut collected: Vec<T> = Vec::new();

            loop {
                let remaining = match limit {
                    Some(limit) => limit.saturating_sub(collected.len()),
                    None => page_size,
                };
                if remaining == 0 {
                    break;
                }
                self.ensure_active("fetch_all")?;

                let request = remaining.min(page_size);
                let page = self
                    .run_query(&descriptor.with_limit(request), partition, collected.last())
                    .await?;
                let short = page.is_short();
                event!(
                    Level::DEBUG,
                    fetched = page.len(),
                    total = collected.len() + page.len(),
                    "page fetched"
                );
                collected.extend(page.into_items());
                if short {
                    break;
                }
            }

            if let Some(limit) = limit {
                collected.truncate(limit);
            }
            Ok(collected)
        }
        .instrument(span)
        .await
    }

    /// First page of the query in its natural order.
    pub async fn fetch_first_page(
        &self,
        predicates: Vec<Predicate>,
        partition: &PartitionKey,
    ) -> Result<Page<T>> {
        let descriptor = self.build(predicates, partition)?;
        self.ensure_active("fetch_first_page")?;
        self.run_query(&descriptor, partition, None).await
    }

    /// One page resuming after `after_id`.
    ///
    /// A cursor id that no longer resolves (deleted upstream, or not in this
    /// partition) yields an empty page instead of an error.
    pub async fn fetch_paginated_after(
        &self,
        predicates: Vec<Predicate>,
        partition: &PartitionKey,
        after_id: &str,
    ) -> Result<Page<T>> {
        let span = info_span!(
            "executor.fetch_after",
            collection = %self.schema.collection,
            after = %after_id
        );
        async {
            let descriptor = self.build(predicates, partition)?;
            self.ensure_active("fetch_paginated_after")?;

            let Some(cursor) = self.get(partition, after_id).await? else {
                event!(Level::WARN, "cursor document no longer resolves");
                return Ok(Page::empty(descriptor.limit()));
            };
            self.ensure_active("fetch_paginated_after")?;
            self.run_query(&descriptor, partition, Some(&cursor)).await
        }
        .instrument(span)
        .await
    }

    /// Fetches the documents with the given ids, one value-in-set query per
    /// chunk, and returns them in the natural order.
    pub async fn fetch_by_ids(&self, partition: &PartitionKey, ids: &[String]) -> Result<Vec<T>> {
        let span = info_span!(
            "executor.fetch_by_ids",
            collection = %self.schema.collection,
            ids = ids.len()
        );
        async {
            let ids = dedup_ids(ids);
            let mut collected = Vec::with_capacity(ids.len());

            for chunk in ids.chunks(self.page_size().max(1)) {
                self.ensure_active("fetch_by_ids")?;
                let descriptor = self.build(
                    vec![
                        Predicate::is_in(self.schema.id_field, chunk.iter().cloned()),
                        Predicate::limit(chunk.len()),
                    ],
                    partition,
                )?;
                let page = self.run_query(&descriptor, partition, None).await?;
                event!(Level::DEBUG, requested = chunk.len(), fetched = page.len(), "chunk fetched");
                collected.extend(page.into_items());
            }

            // chunks are each ordered, their concatenation is not
            let keys = [SortKey::new(
                self.schema.order_field.clone(),
                self.schema.order_descending,
            )];
            sort_documents(&mut collected, &keys);
            Ok(collected)
        }
        .instrument(span)
        .await
    }

    /// Resolves ids through batched point lookups, keeping the requested
    /// order and dropping ids that are missing or belong to another partition.
    pub async fn lookup_ids(&self, partition: &PartitionKey, ids: &[String]) -> Result<Vec<T>> {
        let span = info_span!(
            "executor.lookup_ids",
            collection = %self.schema.collection,
            ids = ids.len()
        );
        async {
            let ids = dedup_ids(ids);
            let mut found: HashMap<String, T> = HashMap::with_capacity(ids.len());

            for chunk in ids.chunks(self.page_size().max(1)) {
                self.ensure_active("lookup_ids")?;
                let docs = self.store.get_by_ids(chunk).await.map_err(|err| self.backend_failure(err))?;
                for doc in docs {
                    if doc.partition_key() != partition.as_str() {
                        event!(Level::WARN, id = %doc.id(), "dropping document from another partition");
                        continue;
                    }
                    found.insert(doc.id().to_string(), doc);
                }
            }

            Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
        }
        .instrument(span)
        .await
    }

    /// Point lookup scoped to `partition`.
    pub async fn get(&self, partition: &PartitionKey, id: &str) -> Result<Option<T>> {
        let doc = self
            .store
            .get_by_id(id)
            .await
            .map_err(|err| self.backend_failure(err))?;
        Ok(doc.filter(|doc| doc.partition_key() == partition.as_str()))
    }

    /// Whether any document matches, fetching at most one.
    pub async fn exists_any(&self, mut predicates: Vec<Predicate>, partition: &PartitionKey) -> Result<bool> {
        predicates.retain(|p| !matches!(p, Predicate::Limit(_)));
        predicates.push(Predicate::limit(1));
        let descriptor = self.build(predicates, partition)?;
        self.ensure_active("exists_any")?;
        let page = self.run_query(&descriptor, partition, None).await?;
        Ok(!page.is_empty())
    }

    fn build(&self, predicates: Vec<Predicate>, partition: &PartitionKey) -> Result<QueryDescriptor> {
        Ok(self
            .schema
            .builder()
            .partition(partition)
            .predicates(predicates)
            .build()?)
    }

    async fn run_query(
        &self,
        descriptor: &QueryDescriptor,
        partition: &PartitionKey,
        start_after: Option<&T>,
    ) -> Result<Page<T>> {
        self.store
            .query(descriptor.predicates(), partition, start_after)
            .await
            .map_err(|err| self.backend_failure(err))
    }

    fn ensure_active(&self, operation: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            event!(Level::DEBUG, operation, "cancelled between requests");
            return Err(StoreError::Cancelled(format!(
                "{} on '{}'",
                operation, self.schema.collection
            )));
        }
        Ok(())
    }

    fn backend_failure(&self, err: BackendError) -> StoreError {
        event!(Level::ERROR, error = %err, collection = %self.schema.collection, "backend request failed");
        StoreError::from(err)
    }
}

fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
