//! Fixtures for in-memory execution contexts.

use super::CollectingOutputObserver;
use crate::context::ExecutionContext;
use crate::state::InMemoryStateStore;
use std::sync::Arc;

/// An execution context wired to an in-memory store and a collecting
/// observer, with both exposed for assertions.
#[derive(Debug)]
pub struct InMemoryFixture {
    /// The execution context under test.
    pub context: Arc<ExecutionContext>,
    /// The backing store shared by every step.
    pub store: Arc<InMemoryStateStore>,
    /// The observer receiving output notifications.
    pub observer: Arc<CollectingOutputObserver>,
}

impl InMemoryFixture {
    /// Creates a fixture with a fresh store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStateStore::new()))
    }

    /// Creates a fixture over an existing store, e.g. to simulate a second
    /// unit of work on the same backend.
    #[must_use]
    pub fn with_store(store: Arc<InMemoryStateStore>) -> Self {
        let observer = Arc::new(CollectingOutputObserver::new());
        let context = ExecutionContext::with_store(store.clone())
            .with_observer(observer.clone())
            .build();
        Self {
            context,
            store,
            observer,
        }
    }
}

impl Default for InMemoryFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates an execution context over a fresh in-memory store.
#[must_use]
pub fn in_memory_context() -> Arc<ExecutionContext> {
    ExecutionContext::with_store(Arc::new(InMemoryStateStore::new())).build()
}
