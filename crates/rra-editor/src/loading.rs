//! ---
//! rra_section: "04-editor-session"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Host-side scenario editor session."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use std::cell::Cell;

use tracing::debug;

/// Page-level busy indicator the session toggles while the editor boots.
pub trait LoadingIndicator {
    /// Request the indicator.
    fn show(&self);
    /// Release one request.
    fn hide(&self);
}

/// Nesting loading overlay: visible while any caller still holds a request.
#[derive(Debug, Default)]
pub struct GlobalLoading {
    depth: Cell<usize>,
}

impl GlobalLoading {
    /// Create a hidden indicator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Outstanding show requests.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Whether the overlay is on screen.
    pub fn is_visible(&self) -> bool {
        self.depth.get() > 0
    }
}

impl LoadingIndicator for GlobalLoading {
    fn show(&self) {
        let depth = self.depth.get() + 1;
        self.depth.set(depth);
        debug!(depth, "global loading shown");
    }

    fn hide(&self) {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        debug!(depth, "global loading hidden");
    }
}
