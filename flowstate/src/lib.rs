//! # Flowstate
//!
//! Per-step execution contexts for a distributed dataflow worker.
//!
//! Flowstate defines the contract between a stateful processing step and
//! the engine running it:
//!
//! - **Execution contexts**: one per unit of work, memoizing one step context per step name
//! - **Tagged state**: typed scalar cells and append-only lists, scoped by an explicit key
//! - **Side inputs**: per-window resolution of materialized views, plus optional publication
//! - **Output hooks**: notification of every main and side output element
//!
//! Persistence, windowing and timers are collaborators: the crate defines
//! the interfaces they must satisfy and ships in-memory implementations
//! for tests and single-process harnesses.
//!
//! ## Quick Start
//!
//! ```rust
//! use flowstate::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStateStore::new());
//! let ctx = ExecutionContext::with_store(store).build();
//!
//! let step = ctx.get_step_context("count-per-user");
//! let key = StateKey::from("user-42");
//! let total = StateTag::<i64>::int64("total");
//!
//! step.store(&key, &total, &7)?;
//! assert_eq!(step.lookup(&key, &total)?, Some(7));
//! # Ok::<(), flowstate::errors::FlowstateError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod coders;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod observability;
pub mod outputs;
pub mod side_inputs;
pub mod state;
pub mod testing;
pub mod timers;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coders::{
        BigEndianI64Coder, Coder, JsonCoder, Utf8Coder, WindowCoder, WindowedValuesCoder,
    };
    pub use crate::config::{ExecutionConfig, LoggingConfig};
    pub use crate::context::{
        Capabilities, ExecutionContext, ExecutionContextBuilder, KeyedState, StepContext,
        StepContextFactory, StoreBackedStepContextFactory, WorkUnitId,
    };
    pub use crate::core::{OutputTag, Window, WindowedValue};
    pub use crate::errors::{
        CoderError, FlowstateError, SideInputNotReadyError, StateBackendError,
        UnsupportedCapabilityError,
    };
    pub use crate::outputs::{LoggingOutputObserver, NoOpOutputObserver, OutputObserver};
    pub use crate::side_inputs::{
        DirectoryViewDataPublisher, InMemoryViewDataPublisher, SideInputResolver, SideInputView,
        SideInputs, ViewDataPublisher, WindowMapping, WindowMappingResolver,
    };
    pub use crate::state::{InMemoryStateStore, KeyedStateStore, StateKey, StateTag, TagMap};
    pub use crate::timers::{TimeDomain, TimerData, TimerManager};
    pub use crate::utils::{Timestamp, TIMESTAMP_MAX_VALUE};
}
