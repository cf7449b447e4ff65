use crate::core::PartitionKey;
use crate::executor::CancelToken;
use std::sync::Arc;

/// Everything a repository needs to talk to the store on behalf of one
/// signed-in user: the partition key, the store handle and the session's
/// cancel token. Passed explicitly; nothing reads it from global state.
pub struct SessionContext<S: ?Sized> {
    partition: PartitionKey,
    store: Arc<S>,
    cancel: CancelToken,
}

impl<S: ?Sized> SessionContext<S> {
    pub fn new(partition: PartitionKey, store: Arc<S>) -> Self {
        Self {
            partition,
            store,
            cancel: CancelToken::new(),
        }
    }

    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Stops every executor loop of this session at its next request boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<S: ?Sized> Clone for SessionContext<S> {
    fn clone(&self) -> Self {
        Self {
            partition: self.partition.clone(),
            store: Arc::clone(&self.store),
            cancel: self.cancel.clone(),
        }
    }
}
