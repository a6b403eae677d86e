//! Per-step contexts and the tagged-state protocol.

use super::ExecutionContext;
use crate::core::{OutputTag, WindowedValue};
use crate::errors::{Result, StateBackendError};
use crate::state::{KeyedStateStore, StateKey, StateTag, TagMap};
use crate::utils::{Timestamp, TIMESTAMP_MAX_VALUE};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// The state and output handle of one named step within one unit of work.
///
/// Every state operation names the key it applies to. Values are encoded
/// with the tag's coder before they reach the backend and decoded on the
/// way back; coder failures propagate to the caller unchanged.
pub struct StepContext {
    step_name: String,
    owner: Weak<ExecutionContext>,
    store: Arc<dyn KeyedStateStore>,
}

impl StepContext {
    /// Creates a step context over a backend.
    ///
    /// `owner` is the execution context that notifications are forwarded
    /// to. It is not kept alive by the step context.
    pub fn new(
        step_name: impl Into<String>,
        owner: Weak<ExecutionContext>,
        store: Arc<dyn KeyedStateStore>,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            owner,
            store,
        }
    }

    /// Returns the step name.
    #[must_use]
    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// Returns the owning execution context, if it is still alive.
    #[must_use]
    pub fn execution_context(&self) -> Option<Arc<ExecutionContext>> {
        self.owner.upgrade()
    }

    /// Binds a key for a sequence of state operations.
    #[must_use]
    pub fn for_key<'a>(&'a self, key: &'a StateKey) -> KeyedState<'a> {
        KeyedState { step: self, key }
    }

    /// Forwards a main output notification to the owning execution context.
    pub fn note_output(&self, output: &WindowedValue) {
        match self.owner.upgrade() {
            Some(owner) => owner.note_output(output),
            None => debug!(
                step = %self.step_name,
                "Dropped output note: execution context is gone"
            ),
        }
    }

    /// Forwards a side output notification to the owning execution context.
    pub fn note_side_output(&self, tag: &OutputTag, output: &WindowedValue) {
        match self.owner.upgrade() {
            Some(owner) => owner.note_side_output(tag, output),
            None => debug!(
                step = %self.step_name,
                output_tag = %tag,
                "Dropped side output note: execution context is gone"
            ),
        }
    }

    /// Stores a scalar value with no time bound, replacing any earlier value.
    pub fn store<T>(&self, key: &StateKey, tag: &StateTag<T>, value: &T) -> Result<()> {
        self.store_with_timestamp(key, tag, value, TIMESTAMP_MAX_VALUE)
    }

    /// Stores a scalar value bounded by `timestamp`.
    pub fn store_with_timestamp<T>(
        &self,
        key: &StateKey,
        tag: &StateTag<T>,
        value: &T,
        timestamp: Timestamp,
    ) -> Result<()> {
        let bytes = tag.coder().encode(value)?;
        trace!(
            step = %self.step_name,
            key = %key,
            tag = tag.name(),
            bytes = bytes.len(),
            "Storing value"
        );
        self.store
            .put_value(&self.step_name, key, tag.name(), bytes, timestamp)?;
        Ok(())
    }

    /// Reads a scalar value. Returns `Ok(None)` if nothing was stored.
    pub fn lookup<T>(&self, key: &StateKey, tag: &StateTag<T>) -> Result<Option<T>> {
        let mut values = self.store.get_values(&self.step_name, key, &[tag.name()])?;
        check_result_count("get_values", 1, values.len())?;
        match values.pop().flatten() {
            Some(bytes) => Ok(Some(tag.coder().decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Reads several scalar values at once.
    ///
    /// The result has one entry per distinct requested tag, each
    /// independently present or absent.
    pub fn lookup_all<'t, T, I>(&self, key: &StateKey, tags: I) -> Result<TagMap<Option<T>>>
    where
        T: 't,
        I: IntoIterator<Item = &'t StateTag<T>>,
    {
        let tags: Vec<&StateTag<T>> = tags.into_iter().collect();
        let names: Vec<&str> = tags.iter().map(|tag| tag.name()).collect();
        let values = self.store.get_values(&self.step_name, key, &names)?;
        check_result_count("get_values", tags.len(), values.len())?;

        let mut result = TagMap::with_capacity(tags.len());
        for (tag, bytes) in tags.into_iter().zip(values) {
            let value = bytes.map(|b| tag.coder().decode(&b)).transpose()?;
            result.insert(tag.shared_name(), value);
        }
        Ok(result)
    }

    /// Appends a value with no time bound to a tag list.
    pub fn write_to_tag_list<T>(&self, key: &StateKey, tag: &StateTag<T>, value: &T) -> Result<()> {
        self.write_to_tag_list_with_timestamp(key, tag, value, TIMESTAMP_MAX_VALUE)
    }

    /// Appends a value bounded by `timestamp` to a tag list.
    pub fn write_to_tag_list_with_timestamp<T>(
        &self,
        key: &StateKey,
        tag: &StateTag<T>,
        value: &T,
        timestamp: Timestamp,
    ) -> Result<()> {
        let bytes = tag.coder().encode(value)?;
        trace!(
            step = %self.step_name,
            key = %key,
            tag = tag.name(),
            bytes = bytes.len(),
            "Appending to tag list"
        );
        self.store
            .append_to_list(&self.step_name, key, tag.name(), bytes, timestamp)?;
        Ok(())
    }

    /// Removes every element of a tag list.
    pub fn delete_tag_list<T>(&self, key: &StateKey, tag: &StateTag<T>) -> Result<()> {
        trace!(step = %self.step_name, key = %key, tag = tag.name(), "Deleting tag list");
        self.store.clear_list(&self.step_name, key, tag.name())?;
        Ok(())
    }

    /// Reads a tag list in append order. An unwritten or deleted list reads
    /// as empty.
    pub fn read_tag_list<T>(&self, key: &StateKey, tag: &StateTag<T>) -> Result<Vec<T>> {
        let mut lists = self.store.read_lists(&self.step_name, key, &[tag.name()])?;
        check_result_count("read_lists", 1, lists.len())?;
        decode_list(tag, lists.pop().unwrap_or_default())
    }

    /// Reads several tag lists at once, one entry per distinct requested tag.
    pub fn read_tag_lists<'t, T, I>(&self, key: &StateKey, tags: I) -> Result<TagMap<Vec<T>>>
    where
        T: 't,
        I: IntoIterator<Item = &'t StateTag<T>>,
    {
        let tags: Vec<&StateTag<T>> = tags.into_iter().collect();
        let names: Vec<&str> = tags.iter().map(|tag| tag.name()).collect();
        let lists = self.store.read_lists(&self.step_name, key, &names)?;
        check_result_count("read_lists", tags.len(), lists.len())?;

        let mut result = TagMap::with_capacity(tags.len());
        for (tag, encoded) in tags.into_iter().zip(lists) {
            result.insert(tag.shared_name(), decode_list(tag, encoded)?);
        }
        Ok(result)
    }

    /// Asks the backend to persist buffered changes for this step.
    pub fn flush(&self) -> Result<()> {
        self.store.flush_step(&self.step_name)?;
        Ok(())
    }
}

impl fmt::Debug for StepContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("step_name", &self.step_name)
            .field("attached", &(self.owner.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

fn decode_list<T>(tag: &StateTag<T>, encoded: Vec<Vec<u8>>) -> Result<Vec<T>> {
    encoded
        .iter()
        .map(|bytes| tag.coder().decode(bytes).map_err(Into::into))
        .collect()
}

fn check_result_count(operation: &str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(StateBackendError::new(
            operation,
            format!("expected {expected} results, backend returned {actual}"),
        )
        .into())
    }
}

/// A step context with its key bound, for a sequence of state operations on
/// the same key.
#[derive(Debug, Clone, Copy)]
pub struct KeyedState<'a> {
    step: &'a StepContext,
    key: &'a StateKey,
}

impl<'a> KeyedState<'a> {
    /// Returns the bound key.
    #[must_use]
    pub fn key(&self) -> &'a StateKey {
        self.key
    }

    /// See [`StepContext::store`].
    pub fn store<T>(&self, tag: &StateTag<T>, value: &T) -> Result<()> {
        self.step.store(self.key, tag, value)
    }

    /// See [`StepContext::store_with_timestamp`].
    pub fn store_with_timestamp<T>(
        &self,
        tag: &StateTag<T>,
        value: &T,
        timestamp: Timestamp,
    ) -> Result<()> {
        self.step.store_with_timestamp(self.key, tag, value, timestamp)
    }

    /// See [`StepContext::lookup`].
    pub fn lookup<T>(&self, tag: &StateTag<T>) -> Result<Option<T>> {
        self.step.lookup(self.key, tag)
    }

    /// See [`StepContext::lookup_all`].
    pub fn lookup_all<'t, T, I>(&self, tags: I) -> Result<TagMap<Option<T>>>
    where
        T: 't,
        I: IntoIterator<Item = &'t StateTag<T>>,
    {
        self.step.lookup_all(self.key, tags)
    }

    /// See [`StepContext::write_to_tag_list`].
    pub fn write_to_tag_list<T>(&self, tag: &StateTag<T>, value: &T) -> Result<()> {
        self.step.write_to_tag_list(self.key, tag, value)
    }

    /// See [`StepContext::write_to_tag_list_with_timestamp`].
    pub fn write_to_tag_list_with_timestamp<T>(
        &self,
        tag: &StateTag<T>,
        value: &T,
        timestamp: Timestamp,
    ) -> Result<()> {
        self.step
            .write_to_tag_list_with_timestamp(self.key, tag, value, timestamp)
    }

    /// See [`StepContext::delete_tag_list`].
    pub fn delete_tag_list<T>(&self, tag: &StateTag<T>) -> Result<()> {
        self.step.delete_tag_list(self.key, tag)
    }

    /// See [`StepContext::read_tag_list`].
    pub fn read_tag_list<T>(&self, tag: &StateTag<T>) -> Result<Vec<T>> {
        self.step.read_tag_list(self.key, tag)
    }

    /// See [`StepContext::read_tag_lists`].
    pub fn read_tag_lists<'t, T, I>(&self, tags: I) -> Result<TagMap<Vec<T>>>
    where
        T: 't,
        I: IntoIterator<Item = &'t StateTag<T>>,
    {
        self.step.read_tag_lists(self.key, tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CoderError, FlowstateError};
    use crate::state::InMemoryStateStore;
    use crate::utils::from_millis;
    use pretty_assertions::assert_eq;

    fn detached_step(store: Arc<InMemoryStateStore>) -> StepContext {
        StepContext::new("count", Weak::new(), store)
    }

    /// A backend that answers batched reads with no results at all.
    struct EmptyResultStore;

    impl KeyedStateStore for EmptyResultStore {
        fn put_value(
            &self,
            _step: &str,
            _key: &StateKey,
            _tag: &str,
            _value: Vec<u8>,
            _timestamp: Timestamp,
        ) -> Result<(), StateBackendError> {
            Ok(())
        }

        fn get_values(
            &self,
            _step: &str,
            _key: &StateKey,
            _tags: &[&str],
        ) -> Result<Vec<Option<Vec<u8>>>, StateBackendError> {
            Ok(Vec::new())
        }

        fn append_to_list(
            &self,
            _step: &str,
            _key: &StateKey,
            _tag: &str,
            _value: Vec<u8>,
            _timestamp: Timestamp,
        ) -> Result<(), StateBackendError> {
            Ok(())
        }

        fn clear_list(
            &self,
            _step: &str,
            _key: &StateKey,
            _tag: &str,
        ) -> Result<(), StateBackendError> {
            Ok(())
        }

        fn read_lists(
            &self,
            _step: &str,
            _key: &StateKey,
            _tags: &[&str],
        ) -> Result<Vec<Vec<Vec<u8>>>, StateBackendError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_store_lookup_round_trip() {
        let store = Arc::new(InMemoryStateStore::new());
        let step = detached_step(Arc::clone(&store));
        let key = StateKey::from("user-1");
        let tag = StateTag::<i64>::int64("total");

        step.store(&key, &tag, &41).unwrap();
        step.store(&key, &tag, &42).unwrap();

        assert_eq!(step.lookup(&key, &tag).unwrap(), Some(42));
        assert_eq!(
            store.cell_timestamp("count", &key, "total"),
            Some(TIMESTAMP_MAX_VALUE)
        );
    }

    #[test]
    fn test_store_with_timestamp_is_passed_to_backend() {
        let store = Arc::new(InMemoryStateStore::new());
        let step = detached_step(Arc::clone(&store));
        let key = StateKey::from("k");
        let bound = from_millis(5_000).unwrap();

        step.store_with_timestamp(&key, &StateTag::utf8("name"), &"a".to_string(), bound)
            .unwrap();
        assert_eq!(store.cell_timestamp("count", &key, "name"), Some(bound));
    }

    #[test]
    fn test_lookup_absent_is_not_an_error() {
        let step = detached_step(Arc::new(InMemoryStateStore::new()));
        let tag = StateTag::utf8("never");
        assert_eq!(step.lookup(&StateKey::from("k"), &tag).unwrap(), None);
    }

    #[test]
    fn test_decode_failure_propagates() {
        let step = detached_step(Arc::new(InMemoryStateStore::new()));
        let key = StateKey::from("k");

        step.store(&key, &StateTag::utf8("value"), &"abc".to_string()).unwrap();
        let err = step.lookup(&key, &StateTag::<i64>::int64("value")).unwrap_err();

        assert!(matches!(
            err,
            FlowstateError::Coder(CoderError::Decode { ref coder, .. })
                if coder == "BigEndianI64Coder"
        ));
    }

    #[test]
    fn test_keyed_state_binds_key() {
        let step = detached_step(Arc::new(InMemoryStateStore::new()));
        let alice = StateKey::from("alice");
        let bob = StateKey::from("bob");
        let tag = StateTag::utf8("events");

        let state = step.for_key(&alice);
        state.write_to_tag_list(&tag, &"login".to_string()).unwrap();
        state.write_to_tag_list(&tag, &"logout".to_string()).unwrap();

        assert_eq!(state.key(), &alice);
        assert_eq!(state.read_tag_list(&tag).unwrap(), vec!["login", "logout"]);
        assert!(step.read_tag_list(&bob, &tag).unwrap().is_empty());
    }

    #[test]
    fn test_notes_are_dropped_when_detached() {
        let step = detached_step(Arc::new(InMemoryStateStore::new()));
        assert!(step.execution_context().is_none());
        step.note_output(&WindowedValue::in_global_window(
            serde_json::json!(1),
            from_millis(0).unwrap(),
        ));
        // Should not panic
    }

    #[test]
    fn test_short_backend_response_is_a_backend_error() {
        let step = StepContext::new("count", Weak::new(), Arc::new(EmptyResultStore));
        let key = StateKey::from("k");
        let a = StateTag::<i64>::int64("a");
        let b = StateTag::<i64>::int64("b");

        let errors = [
            step.lookup(&key, &a).unwrap_err(),
            step.lookup_all(&key, [&a, &b]).unwrap_err(),
            step.read_tag_list(&key, &a).unwrap_err(),
            step.read_tag_lists(&key, [&a, &b]).unwrap_err(),
        ];
        for err in errors {
            match err {
                FlowstateError::Backend(e) => {
                    assert!(e.operation == "get_values" || e.operation == "read_lists");
                    assert!(e.message.contains("backend returned 0"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_tag_list_timestamp_is_passed_to_backend() {
        let store = Arc::new(InMemoryStateStore::new());
        let step = detached_step(Arc::clone(&store));
        let key = StateKey::from("k");
        let tag = StateTag::utf8("events");
        let bound = from_millis(5_000).unwrap();

        step.write_to_tag_list_with_timestamp(&key, &tag, &"bounded".to_string(), bound)
            .unwrap();
        step.for_key(&key)
            .write_to_tag_list(&tag, &"open".to_string())
            .unwrap();

        let snapshot = store.snapshot();
        let timestamps: Vec<Option<i64>> = snapshot.lists[0]
            .values
            .iter()
            .map(|element| element.timestamp_millis)
            .collect();
        assert_eq!(timestamps, vec![Some(5_000), None]);
        assert_eq!(step.read_tag_list(&key, &tag).unwrap(), vec!["bounded", "open"]);
    }
}
