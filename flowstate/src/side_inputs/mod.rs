//! Side inputs: resolving materialized views per window and publishing
//! the data that backs them.

mod publisher;
mod resolver;
mod view;

pub use publisher::{
    DirectoryViewDataPublisher, InMemoryViewDataPublisher, PublishedViewData, ViewDataPublisher,
};
pub use resolver::{SideInputResolver, WindowMappingResolver};
pub use view::{SideInputView, SideInputs, ViewDescriptor, WindowMapping};
