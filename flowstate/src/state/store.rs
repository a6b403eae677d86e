//! Persistence contract for keyed state.

use super::StateKey;
use crate::errors::StateBackendError;
use crate::utils::Timestamp;

/// The byte-level interface a keyed state backend must satisfy.
///
/// State is addressed by `(step name, key, tag name)`. Scalar cells are
/// last-write-wins; tag lists preserve append order. Backends own their
/// concurrency discipline: the runtime never locks around these calls.
pub trait KeyedStateStore: Send + Sync {
    /// Writes or overwrites a scalar cell.
    fn put_value(
        &self,
        step: &str,
        key: &StateKey,
        tag: &str,
        value: Vec<u8>,
        timestamp: Timestamp,
    ) -> Result<(), StateBackendError>;

    /// Reads scalar cells, one result per requested tag in request order.
    fn get_values(
        &self,
        step: &str,
        key: &StateKey,
        tags: &[&str],
    ) -> Result<Vec<Option<Vec<u8>>>, StateBackendError>;

    /// Appends to a tag list.
    fn append_to_list(
        &self,
        step: &str,
        key: &StateKey,
        tag: &str,
        value: Vec<u8>,
        timestamp: Timestamp,
    ) -> Result<(), StateBackendError>;

    /// Removes every element of a tag list.
    fn clear_list(&self, step: &str, key: &StateKey, tag: &str) -> Result<(), StateBackendError>;

    /// Reads tag lists, one sequence per requested tag in request order.
    fn read_lists(
        &self,
        step: &str,
        key: &StateKey,
        tags: &[&str],
    ) -> Result<Vec<Vec<Vec<u8>>>, StateBackendError>;

    /// Persists any buffered changes for a step.
    fn flush_step(&self, _step: &str) -> Result<(), StateBackendError> {
        Ok(())
    }
}
