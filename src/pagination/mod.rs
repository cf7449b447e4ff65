pub mod coordinator;

pub use coordinator::{LoadOutcome, PaginationCoordinator};
