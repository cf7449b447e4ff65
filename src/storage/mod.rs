pub mod cache;

pub use cache::BoundedOrderedCache;
