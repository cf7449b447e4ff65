// ============================================================================
// deckstore - data-access core of the flashcard app
// ============================================================================
//
// Layers, bottom-up:
//   storage::BoundedOrderedCache   capped, deduplicated, ordered item list
//   query::QueryPredicateBuilder   partition-scoped, ceiling-checked queries
//   executor::PartitionedQueryExecutor
//                                  page loops, id batching, cancellation
//   pagination::PaginationCoordinator
//                                  single-flight cursor paging for a list view
//   repository::RefreshOrchestrator
//                                  top-up + back-fill into the cache
//
// `remote::RemoteStore` is the seam to the hosted document store;
// `remote::InMemoryRemoteStore` implements it in process.
//
// ============================================================================

pub mod config;
pub mod core;
pub mod executor;
pub mod model;
pub mod pagination;
pub mod query;
pub mod remote;
pub mod repository;
pub mod retry;
pub mod storage;

pub use config::{DataConfig, EntityConfig, OrderConfig};
pub use crate::core::{ConfigError, Document, PartitionKey, QueryBuildError, Result, StoreError, Value};
pub use executor::{CancelToken, PartitionedQueryExecutor};
pub use model::{Deck, Flashcard, SessionSummary, Subdeck};
pub use pagination::{LoadOutcome, PaginationCoordinator};
pub use query::{Predicate, QueryDescriptor, QueryPredicateBuilder, QuerySchema};
pub use remote::{
    BackendCode, BackendError, InMemoryBackend, InMemoryRemoteStore, Page, RemoteStore,
    RequestLog,
};
pub use repository::{DataSession, DataStore, EntityRepository, RefreshOrchestrator, SessionContext};
pub use retry::{RetryPolicy, retry_unavailable};
pub use storage::BoundedOrderedCache;
