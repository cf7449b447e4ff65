use crate::core::{Document, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Level, event};

type InitialPageFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<T>>> + Send + Sync>;
type NextPageFn<T> = Arc<dyn Fn(String) -> BoxFuture<'static, Result<Vec<T>>> + Send + Sync>;

/// What a load call did to the item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was applied; `appended` items were added (or loaded initially).
    Applied { appended: usize },
    /// The list already ended; nothing was fetched.
    EndOfList,
    /// Another fetch is in flight; this call was coalesced into a no-op.
    Busy,
    /// A reset happened while the fetch was in flight; its result was dropped.
    Stale,
}

struct PagerState<T> {
    items: Vec<T>,
    end_of_list: bool,
    loaded: bool,
    generation: u64,
}

/// Forward-only pager over two caller-supplied page functions.
///
/// At most one fetch runs at a time: `load_more` during a fetch is a no-op,
/// `load_initial` waits for the running fetch. Each fetch remembers the
/// generation it started under and is only applied if that generation is
/// still current, so `reset` discards anything in flight. A failed fetch
/// leaves the list untouched.
pub struct PaginationCoordinator<T> {
    page_size: usize,
    fetch_initial: InitialPageFn<T>,
    fetch_next: NextPageFn<T>,
    state: Mutex<PagerState<T>>,
    fetch_gate: Mutex<()>,
}

impl<T: Document> PaginationCoordinator<T> {
    /// `fetch_next` receives the cursor: the id of the last loaded item.
    pub fn new<I, IF, N, NF>(page_size: usize, fetch_initial: I, fetch_next: N) -> Self
    where
        I: Fn() -> IF + Send + Sync + 'static,
        IF: Future<Output = Result<Vec<T>>> + Send + 'static,
        N: Fn(String) -> NF + Send + Sync + 'static,
        NF: Future<Output = Result<Vec<T>>> + Send + 'static,
    {
        Self {
            page_size: page_size.max(1),
            fetch_initial: Arc::new(move || fetch_initial().boxed()),
            fetch_next: Arc::new(move |cursor| fetch_next(cursor).boxed()),
            state: Mutex::new(PagerState {
                items: Vec::new(),
                end_of_list: false,
                loaded: false,
                generation: 0,
            }),
            fetch_gate: Mutex::new(()),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Replaces the list with the first page.
    pub async fn load_initial(&self) -> Result<LoadOutcome> {
        let generation = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.generation
        };

        let _gate = self.fetch_gate.lock().await;
        if self.state.lock().await.generation != generation {
            return Ok(LoadOutcome::Stale);
        }
        self.fetch_first(generation).await
    }

    /// Appends the next page. Before any load this performs the initial load.
    ///
    /// Returns `Busy` without fetching while any fetch, initial or not, is
    /// in flight.
    pub async fn load_more(&self) -> Result<LoadOutcome> {
        let Ok(_gate) = self.fetch_gate.try_lock() else {
            return Ok(LoadOutcome::Busy);
        };

        let (generation, cursor) = {
            let state = self.state.lock().await;
            if !state.loaded {
                (state.generation, None)
            } else if state.end_of_list {
                return Ok(LoadOutcome::EndOfList);
            } else {
                match state.items.last() {
                    Some(last) => (state.generation, Some(last.id().to_string())),
                    None => return Ok(LoadOutcome::EndOfList),
                }
            }
        };
        let Some(cursor) = cursor else {
            return self.fetch_first(generation).await;
        };

        let result = (self.fetch_next)(cursor).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            event!(Level::DEBUG, generation, "discarding superseded page");
            return Ok(LoadOutcome::Stale);
        }
        let page = result?;
        let appended = page.len();
        state.end_of_list = appended < self.page_size;
        state.items.extend(page);
        Ok(LoadOutcome::Applied { appended })
    }

    // caller holds the fetch gate
    async fn fetch_first(&self, generation: u64) -> Result<LoadOutcome> {
        let result = (self.fetch_initial)().await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            event!(Level::DEBUG, generation, "discarding superseded initial page");
            return Ok(LoadOutcome::Stale);
        }
        let page = result?;
        let appended = page.len();
        state.end_of_list = appended < self.page_size;
        state.items = page;
        state.loaded = true;
        Ok(LoadOutcome::Applied { appended })
    }

    /// Empties the list and invalidates any fetch in flight.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.items.clear();
        state.end_of_list = false;
        state.loaded = false;
    }

    pub async fn items(&self) -> Vec<T> {
        self.state.lock().await.items.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn is_end_of_list(&self) -> bool {
        self.state.lock().await.end_of_list
    }

    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StoreError, Value};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Debug, Clone, PartialEq)]
    struct Row(String);

    impl Document for Row {
        const COLLECTION: &'static str = "rows";

        fn id(&self) -> &str {
            &self.0
        }

        fn partition_key(&self) -> &str {
            "user"
        }

        fn updated_at(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(0, 0).unwrap()
        }

        fn field(&self, _name: &str) -> Option<Value> {
            None
        }
    }

    /// Rows r0..r{total}; each call returns the page after the cursor.
    fn source(total: usize, page: usize) -> impl Fn(Option<String>) -> Vec<Row> + Clone {
        move |cursor| {
            let start = cursor
                .and_then(|c| c.trim_start_matches('r').parse::<usize>().ok())
                .map_or(0, |n| n + 1);
            (start..total.min(start + page)).map(|i| Row(format!("r{}", i))).collect()
        }
    }

    fn pager(total: usize, page: usize) -> PaginationCoordinator<Row> {
        let first = source(total, page);
        let next = source(total, page);
        PaginationCoordinator::new(
            page,
            move || {
                let rows = first(None);
                async move { Ok::<_, StoreError>(rows) }
            },
            move |cursor| {
                let rows = next(Some(cursor));
                async move { Ok::<_, StoreError>(rows) }
            },
        )
    }

    #[tokio::test]
    async fn test_pages_until_short_page() {
        let pager = pager(7, 3);

        assert_eq!(pager.load_initial().await.unwrap(), LoadOutcome::Applied { appended: 3 });
        assert_eq!(pager.load_more().await.unwrap(), LoadOutcome::Applied { appended: 3 });
        assert!(!pager.is_end_of_list().await);
        assert_eq!(pager.load_more().await.unwrap(), LoadOutcome::Applied { appended: 1 });
        assert!(pager.is_end_of_list().await);
        assert_eq!(pager.load_more().await.unwrap(), LoadOutcome::EndOfList);
        assert_eq!(pager.len().await, 7);
    }

    #[tokio::test]
    async fn test_short_initial_page_ends_list() {
        let pager = pager(2, 5);
        pager.load_initial().await.unwrap();

        assert!(pager.is_end_of_list().await);
        let before = pager.items().await;
        assert_eq!(pager.load_more().await.unwrap(), LoadOutcome::EndOfList);
        assert_eq!(pager.items().await, before);
    }

    #[tokio::test]
    async fn test_load_more_before_initial_loads_first_page() {
        let pager = pager(10, 4);
        assert_eq!(pager.load_more().await.unwrap(), LoadOutcome::Applied { appended: 4 });
        assert_eq!(pager.items().await[0], Row("r0".into()));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_untouched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pager = PaginationCoordinator::new(
            2,
            || async { Ok::<_, StoreError>(vec![Row("a".into()), Row("b".into())]) },
            move |_cursor| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<Vec<Row>, _>(StoreError::Unavailable("offline".into())) }
            },
        );
        pager.load_initial().await.unwrap();

        let err = pager.load_more().await.unwrap_err();
        assert_eq!(err, StoreError::Unavailable("offline".into()));
        assert_eq!(pager.len().await, 2);
        assert!(!pager.is_end_of_list().await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_page() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let (s, r) = (Arc::clone(&started), Arc::clone(&release));

        let pager = Arc::new(PaginationCoordinator::new(
            2,
            || async { Ok::<_, StoreError>(vec![Row("a".into()), Row("b".into())]) },
            move |_cursor| {
                let (s, r) = (Arc::clone(&s), Arc::clone(&r));
                async move {
                    s.notify_one();
                    r.notified().await;
                    Ok::<_, StoreError>(vec![Row("c".into()), Row("d".into())])
                }
            },
        ));
        pager.load_initial().await.unwrap();
        let generation = pager.generation().await;

        let in_flight = tokio::spawn({
            let pager = Arc::clone(&pager);
            async move { pager.load_more().await }
        });
        started.notified().await;

        assert_eq!(pager.load_more().await.unwrap(), LoadOutcome::Busy);
        pager.reset().await;
        release.notify_one();

        assert_eq!(in_flight.await.unwrap().unwrap(), LoadOutcome::Stale);
        assert!(pager.items().await.is_empty());
        assert_eq!(pager.generation().await, generation + 1);
    }

    #[tokio::test]
    async fn test_load_more_during_initial_load_is_coalesced() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let fetches = Arc::new(AtomicUsize::new(0));
        let (s, r, n) = (Arc::clone(&started), Arc::clone(&release), Arc::clone(&fetches));

        let pager = Arc::new(PaginationCoordinator::new(
            2,
            move || {
                let (s, r, n) = (Arc::clone(&s), Arc::clone(&r), Arc::clone(&n));
                async move {
                    n.fetch_add(1, Ordering::SeqCst);
                    s.notify_one();
                    r.notified().await;
                    Ok::<_, StoreError>(vec![Row("a".into()), Row("b".into())])
                }
            },
            |_cursor| async { Ok::<_, StoreError>(Vec::new()) },
        ));

        let initial = tokio::spawn({
            let pager = Arc::clone(&pager);
            async move { pager.load_initial().await }
        });
        started.notified().await;

        assert_eq!(pager.load_more().await.unwrap(), LoadOutcome::Busy);
        release.notify_one();

        assert_eq!(initial.await.unwrap().unwrap(), LoadOutcome::Applied { appended: 2 });
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(pager.len().await, 2);
    }
}
