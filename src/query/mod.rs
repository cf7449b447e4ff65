pub mod builder;
pub mod ordering;
pub mod predicate;

pub use builder::{QueryDescriptor, QueryPredicateBuilder, QuerySchema};
pub use ordering::{SortKey, compare_documents, sort_documents};
pub use predicate::Predicate;
