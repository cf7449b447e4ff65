pub mod cancel;
pub mod partitioned;

pub use cancel::CancelToken;
pub use partitioned::PartitionedQueryExecutor;
