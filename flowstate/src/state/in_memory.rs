//! In-memory keyed state backend.

use super::{KeyedStateStore, StateKey};
use crate::errors::StateBackendError;
use crate::utils::{from_millis, Timestamp, TIMESTAMP_MAX_VALUE};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StateAddress {
    step: String,
    key: StateKey,
    tag: String,
}

impl StateAddress {
    fn new(step: &str, key: &StateKey, tag: &str) -> Self {
        Self {
            step: step.to_string(),
            key: key.clone(),
            tag: tag.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    timestamp: Timestamp,
}

/// A keyed state backend held entirely in process memory.
///
/// Suitable for tests and single-process harnesses. State survives only as
/// long as the store, unless exported with [`InMemoryStateStore::snapshot`].
///
/// Every operation holds the restore gate for reading, and
/// [`InMemoryStateStore::restore`] holds it for writing, so a restore is
/// never observed half-applied.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    cells: DashMap<StateAddress, StoredValue>,
    lists: DashMap<StateAddress, Vec<StoredValue>>,
    gate: RwLock<()>,
}

impl InMemoryStateStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of scalar cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let _gate = self.gate.read();
        self.cells.len()
    }

    /// Returns the number of elements currently in a tag list.
    #[must_use]
    pub fn list_len(&self, step: &str, key: &StateKey, tag: &str) -> usize {
        let _gate = self.gate.read();
        self.lists
            .get(&StateAddress::new(step, key, tag))
            .map_or(0, |list| list.len())
    }

    /// Returns the timestamp bound a scalar cell was stored with.
    #[must_use]
    pub fn cell_timestamp(&self, step: &str, key: &StateKey, tag: &str) -> Option<Timestamp> {
        let _gate = self.gate.read();
        self.cells
            .get(&StateAddress::new(step, key, tag))
            .map(|cell| cell.timestamp)
    }

    /// Returns true if the store holds no state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let _gate = self.gate.read();
        self.cells.is_empty() && self.lists.iter().all(|list| list.is_empty())
    }

    /// Removes all state.
    pub fn clear(&self) {
        let _gate = self.gate.write();
        self.cells.clear();
        self.lists.clear();
    }

    /// Exports the full contents in a serializable, deterministic order.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        let _gate = self.gate.read();
        let mut cells: Vec<CellRecord> = self
            .cells
            .iter()
            .map(|entry| CellRecord {
                step: entry.key().step.clone(),
                key: entry.key().key.to_hex(),
                tag: entry.key().tag.clone(),
                value: STANDARD.encode(&entry.value().bytes),
                timestamp_millis: encode_timestamp(entry.value().timestamp),
            })
            .collect();
        cells.sort_by(|a, b| (&a.step, &a.key, &a.tag).cmp(&(&b.step, &b.key, &b.tag)));

        let mut lists: Vec<ListRecord> = self
            .lists
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| ListRecord {
                step: entry.key().step.clone(),
                key: entry.key().key.to_hex(),
                tag: entry.key().tag.clone(),
                values: entry
                    .value()
                    .iter()
                    .map(|element| ListElementRecord {
                        value: STANDARD.encode(&element.bytes),
                        timestamp_millis: encode_timestamp(element.timestamp),
                    })
                    .collect(),
            })
            .collect();
        lists.sort_by(|a, b| (&a.step, &a.key, &a.tag).cmp(&(&b.step, &b.key, &b.tag)));

        StateSnapshot { cells, lists }
    }

    /// Replaces the contents of the store with a snapshot.
    ///
    /// The store is left untouched if the snapshot is malformed.
    pub fn restore(&self, snapshot: &StateSnapshot) -> Result<(), StateBackendError> {
        let mut cells = Vec::with_capacity(snapshot.cells.len());
        for record in &snapshot.cells {
            let address = decode_address(&record.step, &record.key, &record.tag)?;
            cells.push((address, decode_value(&record.value, record.timestamp_millis)?));
        }

        let mut lists = Vec::with_capacity(snapshot.lists.len());
        for record in &snapshot.lists {
            let address = decode_address(&record.step, &record.key, &record.tag)?;
            let values = record
                .values
                .iter()
                .map(|element| decode_value(&element.value, element.timestamp_millis))
                .collect::<Result<Vec<_>, _>>()?;
            lists.push((address, values));
        }

        let _gate = self.gate.write();
        self.cells.clear();
        self.lists.clear();
        for (address, value) in cells {
            self.cells.insert(address, value);
        }
        for (address, values) in lists {
            self.lists.insert(address, values);
        }

        tracing::debug!(
            cells = snapshot.cells.len(),
            lists = snapshot.lists.len(),
            "Restored in-memory state"
        );
        Ok(())
    }
}

impl KeyedStateStore for InMemoryStateStore {
    fn put_value(
        &self,
        step: &str,
        key: &StateKey,
        tag: &str,
        value: Vec<u8>,
        timestamp: Timestamp,
    ) -> Result<(), StateBackendError> {
        let _gate = self.gate.read();
        self.cells.insert(
            StateAddress::new(step, key, tag),
            StoredValue {
                bytes: value,
                timestamp,
            },
        );
        Ok(())
    }

    fn get_values(
        &self,
        step: &str,
        key: &StateKey,
        tags: &[&str],
    ) -> Result<Vec<Option<Vec<u8>>>, StateBackendError> {
        let _gate = self.gate.read();
        Ok(tags
            .iter()
            .map(|tag| {
                self.cells
                    .get(&StateAddress::new(step, key, tag))
                    .map(|cell| cell.bytes.clone())
            })
            .collect())
    }

    fn append_to_list(
        &self,
        step: &str,
        key: &StateKey,
        tag: &str,
        value: Vec<u8>,
        timestamp: Timestamp,
    ) -> Result<(), StateBackendError> {
        let _gate = self.gate.read();
        self.lists
            .entry(StateAddress::new(step, key, tag))
            .or_default()
            .push(StoredValue {
                bytes: value,
                timestamp,
            });
        Ok(())
    }

    fn clear_list(&self, step: &str, key: &StateKey, tag: &str) -> Result<(), StateBackendError> {
        let _gate = self.gate.read();
        self.lists.remove(&StateAddress::new(step, key, tag));
        Ok(())
    }

    fn read_lists(
        &self,
        step: &str,
        key: &StateKey,
        tags: &[&str],
    ) -> Result<Vec<Vec<Vec<u8>>>, StateBackendError> {
        let _gate = self.gate.read();
        Ok(tags
            .iter()
            .map(|tag| {
                self.lists
                    .get(&StateAddress::new(step, key, tag))
                    .map(|list| list.iter().map(|element| element.bytes.clone()).collect())
                    .unwrap_or_default()
            })
            .collect())
    }
}

/// Serializable export of an [`InMemoryStateStore`].
///
/// Keys are hex-encoded and values base64-encoded. A missing timestamp
/// means the value was stored without a time bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Scalar cells.
    #[serde(default)]
    pub cells: Vec<CellRecord>,
    /// Non-empty tag lists.
    #[serde(default)]
    pub lists: Vec<ListRecord>,
}

impl StateSnapshot {
    /// Serializes the snapshot to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses a snapshot from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// One scalar cell in a [`StateSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRecord {
    /// Step name.
    pub step: String,
    /// Hex-encoded key.
    pub key: String,
    /// Tag name.
    pub tag: String,
    /// Base64-encoded value.
    pub value: String,
    /// Timestamp bound in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_millis: Option<i64>,
}

/// One tag list in a [`StateSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRecord {
    /// Step name.
    pub step: String,
    /// Hex-encoded key.
    pub key: String,
    /// Tag name.
    pub tag: String,
    /// Elements in append order.
    pub values: Vec<ListElementRecord>,
}

/// One element of a [`ListRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListElementRecord {
    /// Base64-encoded value.
    pub value: String,
    /// Timestamp bound in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_millis: Option<i64>,
}

fn encode_timestamp(timestamp: Timestamp) -> Option<i64> {
    (timestamp != TIMESTAMP_MAX_VALUE).then(|| timestamp.timestamp_millis())
}

fn decode_address(step: &str, key: &str, tag: &str) -> Result<StateAddress, StateBackendError> {
    let key = StateKey::from_hex(key)
        .map_err(|e| StateBackendError::new("restore", format!("invalid key '{key}': {e}")))?;
    Ok(StateAddress::new(step, &key, tag))
}

fn decode_value(
    value: &str,
    timestamp_millis: Option<i64>,
) -> Result<StoredValue, StateBackendError> {
    let bytes = STANDARD
        .decode(value)
        .map_err(|e| StateBackendError::new("restore", format!("invalid value: {e}")))?;
    let timestamp = match timestamp_millis {
        None => TIMESTAMP_MAX_VALUE,
        Some(millis) => from_millis(millis).ok_or_else(|| {
            StateBackendError::new("restore", format!("timestamp out of range: {millis}"))
        })?,
    };
    Ok(StoredValue { bytes, timestamp })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key() -> StateKey {
        StateKey::from("k")
    }

    #[test]
    fn test_cells_are_last_write_wins() {
        let store = InMemoryStateStore::new();
        store.put_value("s", &key(), "t", b"1".to_vec(), TIMESTAMP_MAX_VALUE).unwrap();
        store.put_value("s", &key(), "t", b"2".to_vec(), TIMESTAMP_MAX_VALUE).unwrap();

        let values = store.get_values("s", &key(), &["t", "missing"]).unwrap();
        assert_eq!(values, vec![Some(b"2".to_vec()), None]);
        assert_eq!(store.cell_count(), 1);
    }

    #[test]
    fn test_state_is_scoped_by_step_and_key() {
        let store = InMemoryStateStore::new();
        store.put_value("a", &key(), "t", b"x".to_vec(), TIMESTAMP_MAX_VALUE).unwrap();

        assert_eq!(store.get_values("b", &key(), &["t"]).unwrap(), vec![None]);
        assert_eq!(
            store.get_values("a", &StateKey::from("other"), &["t"]).unwrap(),
            vec![None]
        );
    }

    #[test]
    fn test_lists_keep_append_order_and_clear() {
        let store = InMemoryStateStore::new();
        for value in ["x", "y", "z"] {
            store
                .append_to_list("s", &key(), "l", value.as_bytes().to_vec(), TIMESTAMP_MAX_VALUE)
                .unwrap();
        }

        let lists = store.read_lists("s", &key(), &["l", "empty"]).unwrap();
        assert_eq!(lists[0], vec![b"x".to_vec(), b"y".to_vec(), b"z".to_vec()]);
        assert!(lists[1].is_empty());
        assert_eq!(store.list_len("s", &key(), "l"), 3);

        store.clear_list("s", &key(), "l").unwrap();
        assert!(store.read_lists("s", &key(), &["l"]).unwrap()[0].is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_restore() {
        let store = InMemoryStateStore::new();
        let bounded = from_millis(1_000).unwrap();
        store.put_value("s", &key(), "cell", vec![0, 1, 2], bounded).unwrap();
        store.put_value("s", &key(), "open", vec![9], TIMESTAMP_MAX_VALUE).unwrap();
        store.append_to_list("s", &key(), "list", vec![7], TIMESTAMP_MAX_VALUE).unwrap();

        let json = store.snapshot().to_json().unwrap();
        let restored = InMemoryStateStore::new();
        restored.restore(&StateSnapshot::from_json(&json).unwrap()).unwrap();

        assert_eq!(restored.snapshot(), store.snapshot());
        assert_eq!(restored.cell_timestamp("s", &key(), "cell"), Some(bounded));
        assert_eq!(
            restored.cell_timestamp("s", &key(), "open"),
            Some(TIMESTAMP_MAX_VALUE)
        );
        assert_eq!(
            restored.read_lists("s", &key(), &["list"]).unwrap(),
            vec![vec![vec![7]]]
        );
    }

    #[test]
    fn test_restore_is_never_observed_partially() {
        let source = InMemoryStateStore::new();
        source.put_value("s", &key(), "a", vec![1], TIMESTAMP_MAX_VALUE).unwrap();
        source.put_value("s", &key(), "b", vec![2], TIMESTAMP_MAX_VALUE).unwrap();
        let snapshot = source.snapshot();

        let store = InMemoryStateStore::new();
        store.restore(&snapshot).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..200 {
                    store.restore(&snapshot).unwrap();
                }
            });
            scope.spawn(|| {
                for _ in 0..200 {
                    let values = store.get_values("s", &key(), &["a", "b"]).unwrap();
                    assert_eq!(values, vec![Some(vec![1]), Some(vec![2])]);
                }
            });
        });
    }

    #[test]
    fn test_restore_rejects_malformed_snapshot() {
        let store = InMemoryStateStore::new();
        store.put_value("s", &key(), "keep", vec![1], TIMESTAMP_MAX_VALUE).unwrap();

        let snapshot = StateSnapshot {
            cells: vec![CellRecord {
                step: "s".to_string(),
                key: "not-hex".to_string(),
                tag: "t".to_string(),
                value: String::new(),
                timestamp_millis: None,
            }],
            lists: Vec::new(),
        };

        let err = store.restore(&snapshot).unwrap_err();
        assert_eq!(err.operation, "restore");
        assert_eq!(store.cell_count(), 1);
    }
}
