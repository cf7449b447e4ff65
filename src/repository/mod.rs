pub mod context;
pub mod entity;
pub mod refresh;
pub mod session;

pub use context::SessionContext;
pub use entity::EntityRepository;
pub use refresh::RefreshOrchestrator;
pub use session::{DataSession, DataStore};
