//! Loading-state signal on the view's root element

use std::sync::Arc;

use tracing::debug;

use super::DataView;

/// Busy indicator and one-shot initial mask for one view
pub struct LoadingSignal {
    view: Arc<dyn DataView>,
    busy_class: String,
    mask_class: String,
    masked: bool,
}

impl LoadingSignal {
    pub fn new(view: Arc<dyn DataView>, busy_class: impl Into<String>, mask_class: impl Into<String>) -> Self {
        Self {
            view,
            busy_class: busy_class.into(),
            mask_class: mask_class.into(),
            masked: false,
        }
    }

    /// Hide unfiltered content until the first refresh completes
    pub fn mask_initial(&mut self) {
        debug!(view_id = %self.view.view_id(), "LoadingSignal::mask_initial: called");
        self.view.add_class(&self.mask_class);
        self.masked = true;
    }

    pub fn show_busy(&self) {
        self.view.add_class(&self.busy_class);
    }

    /// Clear the busy indicator, and the initial mask on first use
    pub fn hide_busy(&mut self) {
        self.view.remove_class(&self.busy_class);
        if self.masked {
            debug!(view_id = %self.view.view_id(), "LoadingSignal::hide_busy: clearing initial mask");
            self.view.remove_class(&self.mask_class);
            self.masked = false;
        }
    }

    pub fn is_masked(&self) -> bool {
        self.masked
    }
}
