//! Keyed, tagged state.
//!
//! This module provides:
//! - Typed tags naming scalar cells and append-only tag lists
//! - The byte-level contract a persistence backend must satisfy
//! - An in-memory reference backend with checkpoint snapshots

mod in_memory;
mod key;
mod store;
mod tag;

pub use in_memory::{CellRecord, InMemoryStateStore, ListElementRecord, ListRecord, StateSnapshot};
pub use key::StateKey;
pub use store::KeyedStateStore;
pub use tag::{StateTag, TagMap};
