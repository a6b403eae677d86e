//! Typed state tags.

use crate::coders::{BigEndianI64Coder, Coder, JsonCoder, Utf8Coder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Names one scalar cell or tag list and supplies the coder for its values.
///
/// Two tags address the same state location iff they have the same name.
/// Reusing a name with a coder that cannot read what an earlier coder wrote
/// is a programming error; it shows up as a decode failure.
pub struct StateTag<T> {
    name: Arc<str>,
    coder: Arc<dyn Coder<T>>,
}

impl<T> StateTag<T> {
    /// Creates a tag with an explicit coder.
    pub fn new(name: impl AsRef<str>, coder: Arc<dyn Coder<T>>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            coder,
        }
    }

    /// Returns the tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the coder used for values under this tag.
    #[must_use]
    pub fn coder(&self) -> &dyn Coder<T> {
        self.coder.as_ref()
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }
}

impl<T> StateTag<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// Creates a tag whose values are encoded as JSON.
    pub fn json(name: impl AsRef<str>) -> Self {
        Self::new(name, Arc::new(JsonCoder::<T>::new()))
    }
}

impl StateTag<String> {
    /// Creates a tag for UTF-8 strings.
    pub fn utf8(name: impl AsRef<str>) -> Self {
        Self::new(name, Arc::new(Utf8Coder))
    }
}

impl StateTag<i64> {
    /// Creates a tag for 64-bit integers.
    pub fn int64(name: impl AsRef<str>) -> Self {
        Self::new(name, Arc::new(BigEndianI64Coder))
    }
}

impl<T> Clone for StateTag<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            coder: Arc::clone(&self.coder),
        }
    }
}

impl<T> PartialEq for StateTag<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for StateTag<T> {}

impl<T> Hash for StateTag<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl<T> fmt::Debug for StateTag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTag")
            .field("name", &self.name)
            .field("coder", &self.coder.name())
            .finish()
    }
}

/// Per-tag results of a batched state read.
///
/// Holds exactly one entry for every distinct tag that was requested.
#[derive(Debug, Clone, PartialEq)]
pub struct TagMap<V> {
    entries: HashMap<Arc<str>, V>,
}

impl<V> TagMap<V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn insert(&mut self, name: Arc<str>, value: V) {
        self.entries.insert(name, value);
    }

    /// Returns the entry for a tag, or `None` if the tag was not requested.
    #[must_use]
    pub fn get<T>(&self, tag: &StateTag<T>) -> Option<&V> {
        self.entries.get(tag.name())
    }

    /// Returns the entry for a tag name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&V> {
        self.entries.get(name)
    }

    /// Returns true if the tag was part of the request.
    #[must_use]
    pub fn contains<T>(&self, tag: &StateTag<T>) -> bool {
        self.entries.contains_key(tag.name())
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no tags were requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(tag name, entry)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(name, value)| (name.as_ref(), value))
    }
}

impl<T> TagMap<Option<T>> {
    /// Returns the stored value for a tag, or `None` if it was absent or
    /// not requested.
    #[must_use]
    pub fn value(&self, tag: &StateTag<T>) -> Option<&T> {
        self.get(tag).and_then(Option::as_ref)
    }
}
