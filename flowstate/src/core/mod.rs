//! Core value types shared by steps and their execution context.

mod element;
mod window;

pub use element::{OutputTag, WindowedValue};
pub use window::Window;
