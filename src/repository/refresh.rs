// ============================================================================
// src/repository/refresh.rs - Two-phase cache fill
// ============================================================================
//
// refresh():
//   1. top-up:    documents updated after the watermark  -> merge_front
//   2. back-fill: only while the cache is below the page floor,
//                 the next page after the cache cursor   -> merge_back
//   3. snapshot of the cache
//
// The watermark is the newest `updated_at` seen by a top-up. Back-filled
// documents never move it: they come from behind the cursor, and if one of
// them is newer it was edited mid-scan, which the next top-up picks up.
// Without a watermark (cold start) the top-up fetches the first page.
//
// The cache lock is held for the whole refresh, so refreshes, back-fills
// and invalidations on one collection never interleave.
//
// ============================================================================

use crate::core::{Document, PartitionKey, Result};
use crate::executor::PartitionedQueryExecutor;
use crate::query::Predicate;
use crate::remote::RemoteStore;
use crate::storage::BoundedOrderedCache;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{Instrument, Level, event, info_span};

struct CacheState<T> {
    cache: BoundedOrderedCache<T>,
    watermark: Option<DateTime<Utc>>,
}

pub struct RefreshOrchestrator<T, S: ?Sized> {
    executor: PartitionedQueryExecutor<T, S>,
    scope: Vec<Predicate>,
    page_floor: usize,
    state: Mutex<CacheState<T>>,
}

impl<T, S> RefreshOrchestrator<T, S>
where
    T: Document,
    S: RemoteStore<T> + ?Sized,
{
    /// `page_floor` is the minimum length a refresh tries to reach by back-filling.
    pub fn new(executor: PartitionedQueryExecutor<T, S>, capacity: usize, page_floor: usize) -> Self {
        Self {
            executor,
            scope: Vec::new(),
            page_floor,
            state: Mutex::new(CacheState {
                cache: BoundedOrderedCache::new(capacity),
                watermark: None,
            }),
        }
    }

    /// Restricts every query to the collection described by `scope`
    /// (e.g. the subdecks of one parent).
    pub fn with_scope(mut self, scope: Vec<Predicate>) -> Self {
        self.scope = scope;
        self
    }

    pub fn executor(&self) -> &PartitionedQueryExecutor<T, S> {
        &self.executor
    }

    pub fn scope(&self) -> &[Predicate] {
        &self.scope
    }

    pub async fn watermark(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.watermark
    }

    /// Seeds the watermark, e.g. from a persisted last-sync time.
    pub async fn set_watermark(&self, watermark: Option<DateTime<Utc>>) {
        self.state.lock().await.watermark = watermark;
    }

    /// Top-up, then back-fill while below the page floor.
    ///
    /// A failed back-fill still leaves the top-up merged into the cache.
    pub async fn refresh(&self, partition: &PartitionKey) -> Result<Vec<T>> {
        let mut state = self.state.lock().await;

        let fresh = self.top_up(&mut state, partition).await?;
        let mut older = 0;
        if state.cache.len() < self.page_floor {
            older = self.back_fill(&mut state, partition).await?;
        }

        event!(
            Level::DEBUG,
            collection = %T::COLLECTION,
            fresh,
            older,
            cached = state.cache.len(),
            "refresh complete"
        );
        Ok(state.cache.snapshot())
    }

    /// Back-fills one page after the cursor regardless of the floor.
    pub async fn load_more(&self, partition: &PartitionKey) -> Result<Vec<T>> {
        let mut state = self.state.lock().await;
        self.back_fill(&mut state, partition).await?;
        Ok(state.cache.snapshot())
    }

    pub async fn invalidate<I, K>(&self, ids: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.state.lock().await.cache.remove(ids);
    }

    /// Empties the cache and forgets the watermark.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.cache.clear();
        state.watermark = None;
    }

    pub async fn snapshot(&self) -> Vec<T> {
        self.state.lock().await.cache.snapshot()
    }

    pub async fn cached(&self, id: &str) -> Option<T> {
        self.state.lock().await.cache.get(id).cloned()
    }

    pub async fn cursor(&self) -> Option<String> {
        self.state.lock().await.cache.cursor().map(str::to_string)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.cache.len()
    }

    async fn top_up(&self, state: &mut CacheState<T>, partition: &PartitionKey) -> Result<usize> {
        let span = info_span!(
            "refresh.top_up",
            collection = %T::COLLECTION,
            watermark = ?state.watermark
        );
        async {
            let fresh = match state.watermark {
                Some(watermark) => {
                    let mut predicates = self.scope.clone();
                    predicates.push(Predicate::greater_than(T::UPDATED_FIELD, watermark));
                    self.executor
                        .fetch_all(predicates, partition, Some(state.cache.capacity()))
                        .await?
                }
                None => {
                    self.executor
                        .fetch_all(self.scope.clone(), partition, Some(self.page_floor))
                        .await?
                }
            };

            let newest = fresh.iter().map(Document::updated_at).max();
            state.watermark = state.watermark.max(newest);
            let count = fresh.len();
            state.cache.merge_front(fresh);
            event!(Level::DEBUG, count, "top-up merged");
            Ok(count)
        }
        .instrument(span)
        .await
    }

    async fn back_fill(&self, state: &mut CacheState<T>, partition: &PartitionKey) -> Result<usize> {
        let cursor = state.cache.cursor().map(str::to_string);
        let span = info_span!(
            "refresh.back_fill",
            collection = %T::COLLECTION,
            cursor = ?cursor
        );
        async {
            let page = match &cursor {
                Some(cursor) => {
                    self.executor
                        .fetch_paginated_after(self.scope.clone(), partition, cursor)
                        .await?
                }
                None => {
                    self.executor
                        .fetch_first_page(self.scope.clone(), partition)
                        .await?
                }
            };

            let count = page.len();
            state.cache.merge_back(page.into_items());
            event!(Level::DEBUG, count, "back-fill merged");
            Ok(count)
        }
        .instrument(span)
        .await
    }
}
