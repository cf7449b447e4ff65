use super::context::SessionContext;
use super::refresh::RefreshOrchestrator;
use crate::config::EntityConfig;
use crate::core::{Document, Result};
use crate::executor::PartitionedQueryExecutor;
use crate::pagination::PaginationCoordinator;
use crate::query::{Predicate, QuerySchema};
use crate::remote::{Page, RemoteStore};
use chrono::{DateTime, Utc};

/// Read path for one collection of one user: a bounded cache kept fresh by
/// the two-phase refresh, plus direct queries through the executor.
pub struct EntityRepository<T, S: ?Sized> {
    context: SessionContext<S>,
    orchestrator: RefreshOrchestrator<T, S>,
}

impl<T, S> EntityRepository<T, S>
where
    T: Document,
    S: RemoteStore<T> + ?Sized + 'static,
{
    pub fn new(context: &SessionContext<S>, config: &EntityConfig, page_size: usize) -> Self {
        Self::scoped(context, config, page_size, Vec::new())
    }

    /// Repository over the subset of the collection matching `scope`.
    pub fn scoped(
        context: &SessionContext<S>,
        config: &EntityConfig,
        page_size: usize,
        scope: Vec<Predicate>,
    ) -> Self {
        let schema = QuerySchema::for_document::<T>(config, page_size);
        let executor = PartitionedQueryExecutor::new(context.store().clone(), schema)
            .with_cancel_token(context.cancel_token().clone());
        let orchestrator =
            RefreshOrchestrator::new(executor, config.capacity, page_size).with_scope(scope);
        Self {
            context: context.clone(),
            orchestrator,
        }
    }

    pub fn context(&self) -> &SessionContext<S> {
        &self.context
    }

    pub fn executor(&self) -> &PartitionedQueryExecutor<T, S> {
        self.orchestrator.executor()
    }

    /// Top-up then back-fill; returns the cached page.
    pub async fn refresh(&self) -> Result<Vec<T>> {
        self.orchestrator.refresh(self.context.partition()).await
    }

    /// Appends the next older page to the cache.
    pub async fn load_more(&self) -> Result<Vec<T>> {
        self.orchestrator.load_more(self.context.partition()).await
    }

    /// Drops ids from the cache, e.g. after the caller deleted them.
    pub async fn invalidate<I, K>(&self, ids: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.orchestrator.invalidate(ids).await;
    }

    pub async fn reset(&self) {
        self.orchestrator.reset().await;
    }

    pub async fn snapshot(&self) -> Vec<T> {
        self.orchestrator.snapshot().await
    }

    pub async fn watermark(&self) -> Option<DateTime<Utc>> {
        self.orchestrator.watermark().await
    }

    pub async fn set_watermark(&self, watermark: Option<DateTime<Utc>>) {
        self.orchestrator.set_watermark(watermark).await;
    }

    /// Cached copy if present, otherwise a scoped point lookup.
    pub async fn get(&self, id: &str) -> Result<Option<T>> {
        if let Some(doc) = self.orchestrator.cached(id).await {
            return Ok(Some(doc));
        }
        self.executor().get(self.context.partition(), id).await
    }

    /// Documents with the given ids, in natural order. Ids outside this
    /// repository's scope are dropped.
    pub async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<T>> {
        let docs = self
            .executor()
            .fetch_by_ids(self.context.partition(), ids)
            .await?;
        Ok(self.in_scope(docs))
    }

    /// Documents with the given ids, in the order requested. Ids outside
    /// this repository's scope are dropped.
    pub async fn lookup_ids(&self, ids: &[String]) -> Result<Vec<T>> {
        let docs = self.executor().lookup_ids(self.context.partition(), ids).await?;
        Ok(self.in_scope(docs))
    }

    /// Whether any document of this collection matches `predicates`.
    pub async fn exists_any(&self, predicates: Vec<Predicate>) -> Result<bool> {
        let mut scoped = self.orchestrator.scope().to_vec();
        scoped.extend(predicates);
        self.executor()
            .exists_any(scoped, self.context.partition())
            .await
    }

    fn in_scope(&self, docs: Vec<T>) -> Vec<T> {
        let scope = self.orchestrator.scope();
        docs.into_iter()
            .filter(|doc| scope.iter().all(|p| p.matches(doc)))
            .collect()
    }

    /// A standalone pager over this collection, independent of the cache.
    pub fn pager(&self) -> PaginationCoordinator<T> {
        let first = (
            self.executor().clone(),
            self.context.partition().clone(),
            self.orchestrator.scope().to_vec(),
        );
        let next = first.clone();

        PaginationCoordinator::new(
            self.executor().page_size(),
            move || {
                let (executor, partition, scope) = first.clone();
                async move {
                    executor
                        .fetch_first_page(scope, &partition)
                        .await
                        .map(Page::into_items)
                }
            },
            move |cursor| {
                let (executor, partition, scope) = next.clone();
                async move {
                    executor
                        .fetch_paginated_after(scope, &partition, &cursor)
                        .await
                        .map(Page::into_items)
                }
            },
        )
    }
}
