//! Execution contexts for one unit of work.
//!
//! This module provides:
//! - The per-bundle [`ExecutionContext`] that memoizes step contexts
//! - The per-step [`StepContext`] exposing keyed, tagged state
//! - The factory seam a harness uses to choose each step's backend

mod execution;
mod factory;
mod identity;
mod step;

pub use execution::{Capabilities, ExecutionContext, ExecutionContextBuilder};
pub use factory::{StepContextFactory, StoreBackedStepContextFactory};
pub use identity::WorkUnitId;
pub use step::{KeyedState, StepContext};
