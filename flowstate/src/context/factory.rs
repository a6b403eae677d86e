//! Step context creation.

use super::{ExecutionContext, StepContext};
use crate::state::KeyedStateStore;
use std::fmt;
use std::sync::{Arc, Weak};

/// Creates the step context for a step the first time an execution context
/// is asked for it.
///
/// The execution context holds its cache lock while the factory runs, so a
/// factory must not call back into the execution context's step lookup.
/// Each call must return a new instance.
pub trait StepContextFactory: Send + Sync {
    /// Builds the context for `step_name`, owned by `owner`.
    fn create_step_context(&self, step_name: &str, owner: Weak<ExecutionContext>) -> StepContext;
}

impl<F> StepContextFactory for F
where
    F: Fn(&str, Weak<ExecutionContext>) -> StepContext + Send + Sync,
{
    fn create_step_context(&self, step_name: &str, owner: Weak<ExecutionContext>) -> StepContext {
        self(step_name, owner)
    }
}

/// Backs every step with one shared keyed state store.
#[derive(Clone)]
pub struct StoreBackedStepContextFactory {
    store: Arc<dyn KeyedStateStore>,
}

impl StoreBackedStepContextFactory {
    /// Creates a factory over a store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyedStateStore>) -> Self {
        Self { store }
    }

    /// Returns the shared store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyedStateStore> {
        &self.store
    }
}

impl fmt::Debug for StoreBackedStepContextFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreBackedStepContextFactory").finish_non_exhaustive()
    }
}

impl StepContextFactory for StoreBackedStepContextFactory {
    fn create_step_context(&self, step_name: &str, owner: Weak<ExecutionContext>) -> StepContext {
        StepContext::new(step_name, owner, Arc::clone(&self.store))
    }
}
