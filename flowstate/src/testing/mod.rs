//! Testing utilities for flowstate harnesses.
//!
//! This module provides:
//! - An output observer that records every notification
//! - Fixtures for in-memory execution contexts

mod fixtures;
mod mocks;

pub use fixtures::{in_memory_context, InMemoryFixture};
pub use mocks::{CollectingOutputObserver, RecordedOutput};
