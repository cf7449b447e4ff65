pub mod document;
pub mod error;
pub mod value;

pub use document::{Document, PartitionKey};
pub use error::{ConfigError, QueryBuildError, Result, StoreError};
pub use value::Value;
