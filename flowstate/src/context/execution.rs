//! The execution context of one unit of work.

use super::{StepContext, StepContextFactory, StoreBackedStepContextFactory, WorkUnitId};
use crate::coders::Coder;
use crate::config::ExecutionConfig;
use crate::core::{OutputTag, Window, WindowedValue};
use crate::errors::{Result, UnsupportedCapabilityError};
use crate::outputs::{
    LoggingOutputObserver, NoOpOutputObserver, OutputObserver, TeeOutputObserver,
};
use crate::side_inputs::{
    DirectoryViewDataPublisher, SideInputResolver, SideInputView, SideInputs, ViewDataPublisher,
    WindowMappingResolver,
};
use crate::state::KeyedStateStore;
use crate::timers::TimerManager;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Capability name reported when view data publication is not configured.
const VIEW_DATA_PUBLICATION: &str = "view_data_publication";

/// Optional capabilities an execution context was built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Whether `write_view_data` can publish side-input data.
    pub view_data_publication: bool,
    /// Whether a timer manager is available. When false, callers emulate
    /// timers themselves.
    pub timers: bool,
}

#[derive(Default)]
struct StepContextCache {
    by_name: HashMap<String, usize>,
    ordered: Vec<Arc<StepContext>>,
}

impl StepContextCache {
    fn get(&self, step_name: &str) -> Option<Arc<StepContext>> {
        self.by_name
            .get(step_name)
            .map(|&index| Arc::clone(&self.ordered[index]))
    }
}

/// Context for one unit of work (bundle).
///
/// Owns the step contexts created during the unit of work, resolves side
/// inputs and receives output notifications. It does not persist between
/// units of work; dropping it discards its step contexts.
pub struct ExecutionContext {
    work_unit_id: WorkUnitId,
    factory: Arc<dyn StepContextFactory>,
    step_contexts: RwLock<StepContextCache>,
    observer: Arc<dyn OutputObserver>,
    side_input_resolver: Arc<dyn SideInputResolver>,
    timer_manager: Option<Arc<dyn TimerManager>>,
    view_data_publisher: Option<Arc<dyn ViewDataPublisher>>,
}

impl ExecutionContext {
    /// Starts building a context whose step contexts come from `factory`.
    pub fn builder(factory: impl StepContextFactory + 'static) -> ExecutionContextBuilder {
        ExecutionContextBuilder::new(Arc::new(factory))
    }

    /// Starts building a context whose steps all share one state store.
    pub fn with_store(store: Arc<dyn KeyedStateStore>) -> ExecutionContextBuilder {
        Self::builder(StoreBackedStepContextFactory::new(store))
    }

    /// Returns the unit-of-work identity.
    #[must_use]
    pub fn work_unit_id(&self) -> WorkUnitId {
        self.work_unit_id
    }

    /// Returns the step context for `step_name`, creating it on first use.
    ///
    /// Repeated calls with the same name return the same instance for the
    /// lifetime of this execution context, including under concurrent
    /// callers.
    pub fn get_step_context(self: &Arc<Self>, step_name: &str) -> Arc<StepContext> {
        let cached = self.step_contexts.read().get(step_name);
        if let Some(existing) = cached {
            return existing;
        }

        let mut cache = self.step_contexts.write();
        if let Some(existing) = cache.get(step_name) {
            return existing;
        }

        let created = Arc::new(
            self.factory
                .create_step_context(step_name, Arc::downgrade(self)),
        );
        let index = cache.ordered.len();
        cache.by_name.insert(step_name.to_string(), index);
        cache.ordered.push(Arc::clone(&created));

        debug!(
            work_unit_id = %self.work_unit_id,
            step = %step_name,
            step_count = cache.ordered.len(),
            "Created step context"
        );
        created
    }

    /// Returns every step context created so far, in creation order.
    #[must_use]
    pub fn all_step_contexts(&self) -> Vec<Arc<StepContext>> {
        self.step_contexts.read().ordered.clone()
    }

    /// Returns the number of step contexts created so far.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.step_contexts.read().ordered.len()
    }

    /// Returns the optional capabilities this context was built with.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            view_data_publication: self.view_data_publisher.is_some(),
            timers: self.timer_manager.is_some(),
        }
    }

    /// Returns the timer manager, or `None` if the caller must emulate
    /// timers.
    #[must_use]
    pub fn timer_manager(&self) -> Option<Arc<dyn TimerManager>> {
        self.timer_manager.clone()
    }

    /// Notifies the observer of an element emitted to the main output.
    pub fn note_output(&self, output: &WindowedValue) {
        self.observer.note_output(output);
    }

    /// Notifies the observer of an element emitted to a side output.
    pub fn note_side_output(&self, tag: &OutputTag, output: &WindowedValue) {
        self.observer.note_side_output(tag, output);
    }

    /// Resolves the value of `view` for the main-input `window` from the
    /// side inputs the caller has available.
    ///
    /// Fails with a "side input not ready" error when `side_inputs` has no
    /// matching entry; callers should defer the work and retry. The supplied
    /// tuple is never modified or cached.
    pub fn get_side_input<T>(
        &self,
        view: &SideInputView<T>,
        window: &Window,
        side_inputs: &SideInputs,
    ) -> Result<T> {
        let encoded = self
            .side_input_resolver
            .resolve(view.descriptor(), window, side_inputs)
            .map_err(|e| {
                debug!(
                    work_unit_id = %self.work_unit_id,
                    view = %e.view,
                    window = %e.window,
                    "Side input not ready"
                );
                e
            })?;
        Ok(view.coder().decode(encoded)?)
    }

    /// Publishes one window's worth of a side-input-producing collection.
    ///
    /// Fails with an "unsupported capability" error on every call if this
    /// context was built without a [`ViewDataPublisher`]; check
    /// [`ExecutionContext::capabilities`] first.
    pub fn write_view_data<D>(
        &self,
        tag: &OutputTag,
        data: &D,
        data_coder: &dyn Coder<D>,
        window: &Window,
        window_coder: &dyn Coder<Window>,
    ) -> Result<()> {
        let Some(publisher) = &self.view_data_publisher else {
            return Err(UnsupportedCapabilityError::new(VIEW_DATA_PUBLICATION).into());
        };

        let encoded_window = window_coder.encode(window)?;
        let encoded_data = data_coder.encode(data)?;
        trace!(
            work_unit_id = %self.work_unit_id,
            tag = %tag,
            window = %window,
            bytes = encoded_data.len(),
            "Writing view data"
        );
        publisher.publish(tag, &encoded_window, &encoded_data)
    }

    /// Flushes the state backend of every step context, in creation order.
    pub fn flush_state(&self) -> Result<()> {
        for step in self.all_step_contexts() {
            step.flush()?;
        }
        debug!(
            work_unit_id = %self.work_unit_id,
            step_count = self.step_count(),
            "Flushed step state"
        );
        Ok(())
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<String> = self
            .step_contexts
            .read()
            .ordered
            .iter()
            .map(|step| step.step_name().to_string())
            .collect();
        f.debug_struct("ExecutionContext")
            .field("work_unit_id", &self.work_unit_id)
            .field("steps", &steps)
            .field("capabilities", &self.capabilities())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ExecutionContext`].
pub struct ExecutionContextBuilder {
    work_unit_id: Option<WorkUnitId>,
    factory: Arc<dyn StepContextFactory>,
    observer: Arc<dyn OutputObserver>,
    log_outputs: bool,
    side_input_resolver: Arc<dyn SideInputResolver>,
    timer_manager: Option<Arc<dyn TimerManager>>,
    view_data_publisher: Option<Arc<dyn ViewDataPublisher>>,
}

impl ExecutionContextBuilder {
    /// Creates a builder with no optional capabilities.
    #[must_use]
    pub fn new(factory: Arc<dyn StepContextFactory>) -> Self {
        Self {
            work_unit_id: None,
            factory,
            observer: Arc::new(NoOpOutputObserver),
            log_outputs: false,
            side_input_resolver: Arc::new(WindowMappingResolver),
            timer_manager: None,
            view_data_publisher: None,
        }
    }

    /// Creates a builder configured from an [`ExecutionConfig`].
    #[must_use]
    pub fn from_config(factory: Arc<dyn StepContextFactory>, config: &ExecutionConfig) -> Self {
        let mut builder = Self::new(factory).with_output_logging(config.log_outputs);
        if let Some(dir) = &config.view_data_dir {
            builder = builder
                .with_view_data_publisher(Arc::new(DirectoryViewDataPublisher::new(dir.clone())));
        }
        builder
    }

    /// Sets the unit-of-work identity. A random one is generated otherwise.
    #[must_use]
    pub fn with_work_unit_id(mut self, id: WorkUnitId) -> Self {
        self.work_unit_id = Some(id);
        self
    }

    /// Sets the output observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn OutputObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Additionally logs every output notification at debug level.
    #[must_use]
    pub fn with_output_logging(mut self, enabled: bool) -> Self {
        self.log_outputs = enabled;
        self
    }

    /// Sets the side input resolver.
    #[must_use]
    pub fn with_side_input_resolver(mut self, resolver: Arc<dyn SideInputResolver>) -> Self {
        self.side_input_resolver = resolver;
        self
    }

    /// Sets the timer manager.
    #[must_use]
    pub fn with_timer_manager(mut self, manager: Arc<dyn TimerManager>) -> Self {
        self.timer_manager = Some(manager);
        self
    }

    /// Enables side-input data publication.
    #[must_use]
    pub fn with_view_data_publisher(mut self, publisher: Arc<dyn ViewDataPublisher>) -> Self {
        self.view_data_publisher = Some(publisher);
        self
    }

    /// Builds the context.
    #[must_use]
    pub fn build(self) -> Arc<ExecutionContext> {
        let observer: Arc<dyn OutputObserver> = if self.log_outputs {
            Arc::new(TeeOutputObserver {
                first: self.observer,
                second: LoggingOutputObserver::default(),
            })
        } else {
            self.observer
        };

        let context = ExecutionContext {
            work_unit_id: self.work_unit_id.unwrap_or_default(),
            factory: self.factory,
            step_contexts: RwLock::new(StepContextCache::default()),
            observer,
            side_input_resolver: self.side_input_resolver,
            timer_manager: self.timer_manager,
            view_data_publisher: self.view_data_publisher,
        };
        debug!(
            work_unit_id = %context.work_unit_id,
            capabilities = ?context.capabilities(),
            "Created execution context"
        );
        Arc::new(context)
    }
}
