//! The layout/geometry collaborator boundary.

use std::collections::HashMap;

use cinegrid_core::{RectPx, ViewportId};

/// Reports the current on-screen rectangle for a viewport slot.
///
/// Implemented by the host UI layer. Polled only on explicit sync calls,
/// never per tick.
pub trait LayoutProvider {
    /// Device-pixel rectangle for the slot, or None if it is not currently
    /// laid out (hidden, collapsed, or being torn down).
    fn slot_rect(&self, id: ViewportId) -> Option<RectPx>;
}

/// Map-backed provider for hosts with precomputed rectangles, and for
/// tests.
#[derive(Debug, Default, Clone)]
pub struct StaticLayout {
    rects: HashMap<ViewportId, RectPx>,
}

impl StaticLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace a slot's rectangle.
    pub fn place(&mut self, id: ViewportId, rect: RectPx) {
        self.rects.insert(id, rect);
    }

    /// Remove a slot's rectangle.
    pub fn remove(&mut self, id: ViewportId) {
        self.rects.remove(&id);
    }
}

impl LayoutProvider for StaticLayout {
    fn slot_rect(&self, id: ViewportId) -> Option<RectPx> {
        self.rects.get(&id).copied()
    }
}
