//! Output notification hooks.
//!
//! A harness observes every element a step emits by giving its execution
//! context an [`OutputObserver`]. Observers see the data path; they never
//! alter it.

mod observer;

pub(crate) use observer::TeeOutputObserver;
pub use observer::{LoggingOutputObserver, NoOpOutputObserver, OutputObserver};
