//! Side input views and the tuple of materialized values a caller supplies.

use crate::coders::{Coder, JsonCoder};
use crate::core::Window;
use crate::errors::CoderError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// How a main-input window selects the side input window to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMapping {
    /// Read the side input in the same window as the main input.
    #[default]
    Identity,
    /// Always read the side input in the global window.
    Global,
}

impl WindowMapping {
    /// Maps a main-input window to the side input window.
    #[must_use]
    pub fn map(self, main_window: &Window) -> Window {
        match self {
            Self::Identity => main_window.clone(),
            Self::Global => Window::Global,
        }
    }
}

/// The untyped part of a view: its identity and window mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewDescriptor {
    /// Unique view id.
    pub id: String,
    /// Window mapping.
    #[serde(default)]
    pub window_mapping: WindowMapping,
}

/// A typed handle on a side input.
pub struct SideInputView<T> {
    descriptor: ViewDescriptor,
    coder: Arc<dyn Coder<T>>,
}

impl<T> SideInputView<T> {
    /// Creates a view with an explicit coder.
    pub fn new(
        id: impl Into<String>,
        window_mapping: WindowMapping,
        coder: Arc<dyn Coder<T>>,
    ) -> Self {
        Self {
            descriptor: ViewDescriptor {
                id: id.into(),
                window_mapping,
            },
            coder,
        }
    }

    /// Returns the view id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Returns the untyped descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &ViewDescriptor {
        &self.descriptor
    }

    /// Returns the coder for the materialized value.
    #[must_use]
    pub fn coder(&self) -> &dyn Coder<T> {
        self.coder.as_ref()
    }
}

impl<T> SideInputView<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// Creates a view whose materialized value is encoded as JSON.
    pub fn json(id: impl Into<String>, window_mapping: WindowMapping) -> Self {
        Self::new(id, window_mapping, Arc::new(JsonCoder::<T>::new()))
    }
}

impl<T> Clone for SideInputView<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            coder: Arc::clone(&self.coder),
        }
    }
}

impl<T> fmt::Debug for SideInputView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SideInputView")
            .field("descriptor", &self.descriptor)
            .field("coder", &self.coder.name())
            .finish()
    }
}

/// Materialized side inputs available to one invocation, keyed by
/// `(view id, window)` and held in encoded form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideInputs {
    entries: HashMap<(String, Window), Vec<u8>>,
}

impl SideInputs {
    /// Creates an empty tuple.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes and adds the value of a view in a window.
    pub fn insert<T>(
        &mut self,
        view: &SideInputView<T>,
        window: Window,
        value: &T,
    ) -> Result<(), CoderError> {
        let bytes = view.coder().encode(value)?;
        self.insert_encoded(view.id(), window, bytes);
        Ok(())
    }

    /// Adds an already-encoded value.
    pub fn insert_encoded(&mut self, view_id: impl Into<String>, window: Window, bytes: Vec<u8>) {
        self.entries.insert((view_id.into(), window), bytes);
    }

    /// Sets a value, returning the tuple for chaining.
    pub fn with<T>(
        mut self,
        view: &SideInputView<T>,
        window: Window,
        value: &T,
    ) -> Result<Self, CoderError> {
        self.insert(view, window, value)?;
        Ok(self)
    }

    /// Returns the encoded value of a view in exactly this window.
    #[must_use]
    pub fn get_encoded(&self, view_id: &str, window: &Window) -> Option<&[u8]> {
        self.entries
            .get(&(view_id.to_string(), window.clone()))
            .map(Vec::as_slice)
    }

    /// Returns true if the view is present in the window.
    #[must_use]
    pub fn contains(&self, view_id: &str, window: &Window) -> bool {
        self.get_encoded(view_id, window).is_some()
    }

    /// Returns the number of `(view, window)` entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no side inputs are available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
