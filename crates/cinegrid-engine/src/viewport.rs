//! Viewport slot state.

use cinegrid_core::{
    GpuRegion, Playback, PlaybackClock, RectPx, SeriesInfo, ViewportId, ViewportTransform,
    WindowLevel,
};
use serde::{Deserialize, Serialize};

/// Authoritative state for one viewport slot. Owned by `ViewportManager`;
/// everything outside the engine crate sees `ViewportSnapshot` copies.
#[derive(Debug)]
pub(crate) struct ViewportSlot {
    pub id: ViewportId,
    pub series: Option<SeriesInfo>,
    pub transform: ViewportTransform,
    pub window_level: Option<WindowLevel>,
    pub playback: Playback,
    /// Frame-advance clock; None until the scheduler anchors it at the
    /// first tick after playback (re)starts or the rate changes.
    pub clock: Option<PlaybackClock>,
    /// Stable texture-unit binding index, unique within the batch.
    pub texture_unit: u32,
    /// Last synced on-screen rectangle, device pixels.
    pub bounds_px: Option<RectPx>,
    /// Draw region derived from `bounds_px` at the last sync.
    pub region: Option<GpuRegion>,
}

impl ViewportSlot {
    pub(crate) fn new(texture_unit: u32) -> Self {
        Self {
            id: ViewportId::new(),
            series: None,
            transform: ViewportTransform::IDENTITY,
            window_level: None,
            playback: Playback::default(),
            clock: None,
            texture_unit,
            bounds_px: None,
            region: None,
        }
    }

    pub(crate) fn snapshot(&self) -> ViewportSnapshot {
        ViewportSnapshot {
            id: self.id,
            series: self.series.clone(),
            transform: self.transform,
            window_level: self.window_level,
            playback: self.playback,
            texture_unit: self.texture_unit,
            bounds_px: self.bounds_px,
            region: self.region,
        }
    }
}

/// Immutable copy of a slot's externally visible state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportSnapshot {
    pub id: ViewportId,
    pub series: Option<SeriesInfo>,
    pub transform: ViewportTransform,
    pub window_level: Option<WindowLevel>,
    pub playback: Playback,
    pub texture_unit: u32,
    pub bounds_px: Option<RectPx>,
    pub region: Option<GpuRegion>,
}
