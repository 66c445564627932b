//! Load progress rendering.

use std::sync::Arc;

use tracing::debug;

use crate::inference::engine::{ProgressEvent, ProgressObserver};
use crate::ui::Surface;

/// Maps progress events to `Loading: N%` on the output region.
pub struct ProgressRenderer {
    surface: Arc<dyn Surface>,
}

impl ProgressRenderer {
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self { surface }
    }

    pub fn render(event: &ProgressEvent) -> String {
        format!("Loading: {}%", event.percent())
    }
}

impl ProgressObserver for ProgressRenderer {
    fn on_progress(&self, event: &ProgressEvent) {
        debug!(
            percent = event.percent(),
            step = event.text.as_deref().unwrap_or(""),
            "Load progress"
        );
        self.surface.set_output(&Self::render(event));
    }
}
