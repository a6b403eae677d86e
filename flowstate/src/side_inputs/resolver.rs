//! Side input resolution.

use super::{SideInputs, ViewDescriptor};
use crate::core::Window;
use crate::errors::SideInputNotReadyError;

/// Finds the materialized value of a view for a main-input window among
/// the side inputs a caller supplied.
pub trait SideInputResolver: Send + Sync {
    /// Returns the encoded value, or [`SideInputNotReadyError`] if the
    /// supplied tuple has no matching entry.
    fn resolve<'a>(
        &self,
        view: &ViewDescriptor,
        main_window: &Window,
        available: &'a SideInputs,
    ) -> Result<&'a [u8], SideInputNotReadyError>;
}

/// Maps the main-input window through the view's [`WindowMapping`] and
/// requires an exact match.
///
/// [`WindowMapping`]: super::WindowMapping
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowMappingResolver;

impl SideInputResolver for WindowMappingResolver {
    fn resolve<'a>(
        &self,
        view: &ViewDescriptor,
        main_window: &Window,
        available: &'a SideInputs,
    ) -> Result<&'a [u8], SideInputNotReadyError> {
        let side_window = view.window_mapping.map(main_window);
        available
            .get_encoded(&view.id, &side_window)
            .ok_or_else(|| SideInputNotReadyError::new(&view.id, side_window.to_string()))
    }
}
