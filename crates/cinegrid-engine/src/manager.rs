//! Authoritative per-viewport state and the layout→GPU-region sync.
//!
//! All mutation goes through validated setters that clamp or silently
//! ignore bad input: a mutator racing slot teardown in the host UI must
//! never turn into an error path.

use cinegrid_core::{
    clamp_device_pixel_ratio, clamp_fps, gpu_region_for_rect, SeriesInfo, Vec2, ViewportId,
    ViewportTransform, WindowLevel, DEFAULT_MAX_DEVICE_PIXEL_RATIO,
};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::layout::LayoutProvider;
use crate::viewport::{ViewportSlot, ViewportSnapshot};

/// Ticks to wait after `mark_needs_sync` before resampling rectangles,
/// letting host layout settle. Until then stale regions may draw slightly
/// misaligned; that latency is accepted and bounded.
const RESYNC_DELAY_TICKS: u8 = 2;

/// Owns every viewport slot and the mapping from host layout rectangles to
/// GPU draw regions. Issues no draw calls.
pub struct ViewportManager {
    slots: Vec<ViewportSlot>,
    index: HashMap<ViewportId, usize>,
    surface_width_px: f32,
    surface_height_px: f32,
    dpr: f32,
    max_dpr: f32,
    resync_countdown: Option<u8>,
}

impl ViewportManager {
    /// Create a manager with the default device-pixel-ratio cap.
    pub fn new() -> Self {
        Self::with_max_dpr(DEFAULT_MAX_DEVICE_PIXEL_RATIO)
    }

    /// Create a manager capping the device pixel ratio at `max_dpr`.
    pub fn with_max_dpr(max_dpr: f32) -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            surface_width_px: 0.0,
            surface_height_px: 0.0,
            dpr: 1.0,
            max_dpr,
            resync_countdown: None,
        }
    }

    // ── Slot lifecycle ─────────────────────────────────────────

    /// Tear down any existing slots and allocate `count` new ones as a
    /// single batch. Returns the new ids in creation order; each slot gets
    /// the texture unit matching its creation index.
    pub fn create_slots(&mut self, count: usize) -> Vec<ViewportId> {
        if !self.slots.is_empty() {
            debug!(old = self.slots.len(), new = count, "replacing slot batch");
        }
        self.slots = (0..count).map(|i| ViewportSlot::new(i as u32)).collect();
        self.index = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (slot.id, i))
            .collect();
        info!(count, "allocated viewport slots");
        self.slots.iter().map(|slot| slot.id).collect()
    }

    /// Release all slots. Idempotent.
    pub fn dispose(&mut self) {
        if !self.slots.is_empty() {
            info!(count = self.slots.len(), "disposing viewport slots");
        }
        self.slots.clear();
        self.index.clear();
        self.resync_countdown = None;
    }

    /// Number of live slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    // ── Snapshots ──────────────────────────────────────────────

    /// Immutable snapshot of one viewport.
    pub fn viewport(&self, id: ViewportId) -> Option<ViewportSnapshot> {
        self.slot(id).map(ViewportSlot::snapshot)
    }

    /// Immutable snapshots of every viewport, in creation order.
    pub fn all_viewports(&self) -> Vec<ViewportSnapshot> {
        self.slots.iter().map(ViewportSlot::snapshot).collect()
    }

    // ── Series ─────────────────────────────────────────────────

    /// Attach series metadata, resetting the frame position to 0. If no
    /// window has been set, the series' full-range default is applied.
    pub fn set_viewport_series(&mut self, id: ViewportId, series: SeriesInfo) {
        let Some(slot) = self.slot_mut(id) else {
            return;
        };
        slot.playback.current_frame = 0;
        if slot.window_level.is_none() {
            slot.window_level = Some(series.default_window_level());
        }
        slot.series = Some(series);
        slot.clock = None;
    }

    /// Attach series metadata while keeping (and clamping) the current
    /// frame position. Used when swapping in a re-decoded copy of the
    /// series already on screen.
    pub fn set_viewport_series_keep_frame(&mut self, id: ViewportId, series: SeriesInfo) {
        let Some(slot) = self.slot_mut(id) else {
            return;
        };
        slot.playback.current_frame = series.clamp_frame(slot.playback.current_frame);
        if slot.window_level.is_none() {
            slot.window_level = Some(series.default_window_level());
        }
        slot.series = Some(series);
    }

    // ── Validated setters ──────────────────────────────────────

    /// Set the grayscale window.
    pub fn set_viewport_window_level(&mut self, id: ViewportId, center: f32, width: f32) {
        if let Some(slot) = self.slot_mut(id) {
            slot.window_level = Some(WindowLevel::new(center, width));
        }
    }

    /// Set the pan offset in device pixels.
    pub fn set_viewport_pan(&mut self, id: ViewportId, pan: Vec2) {
        if let Some(slot) = self.slot_mut(id) {
            slot.transform.pan = pan;
        }
    }

    /// Set the zoom factor, clamped to the accepted range.
    pub fn set_viewport_zoom(&mut self, id: ViewportId, zoom: f32) {
        if let Some(slot) = self.slot_mut(id) {
            slot.transform.zoom = ViewportTransform::clamp_zoom(zoom);
        }
    }

    /// Set the frame position, clamped to `[0, frame_count - 1]`. No-op
    /// without an attached series.
    pub fn set_viewport_frame(&mut self, id: ViewportId, frame: u32) {
        if let Some(slot) = self.slot_mut(id) {
            if let Some(series) = &slot.series {
                slot.playback.current_frame = series.clamp_frame(frame);
            }
        }
    }

    /// Set the rotation in degrees.
    pub fn set_viewport_rotation(&mut self, id: ViewportId, degrees: f32) {
        if let Some(slot) = self.slot_mut(id) {
            slot.transform.rotation_degrees = if degrees.is_finite() { degrees } else { 0.0 };
        }
    }

    /// Set both mirror flags.
    pub fn set_viewport_flip(&mut self, id: ViewportId, flip_h: bool, flip_v: bool) {
        if let Some(slot) = self.slot_mut(id) {
            slot.transform.flip_h = flip_h;
            slot.transform.flip_v = flip_v;
        }
    }

    /// Start or stop this viewport's cine loop.
    pub fn set_viewport_playing(&mut self, id: ViewportId, playing: bool) {
        if let Some(slot) = self.slot_mut(id) {
            if slot.playback.is_playing != playing {
                slot.playback.is_playing = playing;
                slot.clock = None;
            }
        }
    }

    /// Set the playback rate, clamped to `[1, 60]` fps.
    pub fn set_viewport_fps(&mut self, id: ViewportId, fps: u32) {
        if let Some(slot) = self.slot_mut(id) {
            let fps = clamp_fps(fps);
            if slot.playback.fps != fps {
                slot.playback.fps = fps;
                slot.clock = None;
            }
        }
    }

    /// Restore the identity transform. Playback and frame position are
    /// untouched. Idempotent.
    pub fn reset_viewport(&mut self, id: ViewportId) {
        if let Some(slot) = self.slot_mut(id) {
            slot.transform = ViewportTransform::IDENTITY;
        }
    }

    // ── Surface metrics & layout sync ──────────────────────────

    /// Record the shared surface size in device pixels. Schedules a resync
    /// since every region depends on the surface height.
    pub fn set_surface_size(&mut self, width_px: f32, height_px: f32) {
        self.surface_width_px = width_px;
        self.surface_height_px = height_px;
        self.mark_needs_sync();
    }

    /// Record the device pixel ratio, clamped to the configured maximum.
    pub fn set_device_pixel_ratio(&mut self, dpr: f32) {
        self.dpr = clamp_device_pixel_ratio(dpr, self.max_dpr);
        self.mark_needs_sync();
    }

    /// Effective (clamped) device pixel ratio.
    pub fn device_pixel_ratio(&self) -> f32 {
        self.dpr
    }

    /// Request a rectangle resync two ticks from now.
    pub fn mark_needs_sync(&mut self) {
        self.resync_countdown = Some(RESYNC_DELAY_TICKS);
    }

    /// Tick the resync countdown; returns true exactly when the deferred
    /// sync becomes due. Called once per scheduler tick.
    pub fn take_due_resync(&mut self) -> bool {
        match self.resync_countdown {
            Some(0) | None => {
                self.resync_countdown = None;
                false
            }
            Some(1) => {
                self.resync_countdown = None;
                true
            }
            Some(n) => {
                self.resync_countdown = Some(n - 1);
                false
            }
        }
    }

    /// Re-poll one slot's rectangle and recompute its draw region.
    pub fn sync_slot(&mut self, id: ViewportId, layout: &dyn LayoutProvider) {
        let dpr = self.dpr;
        let surface_height = self.surface_height_px;
        if let Some(slot) = self.slot_mut(id) {
            match layout.slot_rect(id) {
                Some(rect) => {
                    slot.bounds_px = Some(rect);
                    slot.region = Some(gpu_region_for_rect(rect, dpr, surface_height));
                }
                None => {
                    slot.bounds_px = None;
                    slot.region = None;
                }
            }
        }
    }

    /// Re-poll every slot's rectangle.
    pub fn sync_all_slots(&mut self, layout: &dyn LayoutProvider) {
        let ids: Vec<ViewportId> = self.slots.iter().map(|slot| slot.id).collect();
        for id in ids {
            self.sync_slot(id, layout);
        }
    }

    // ── Scheduler access ───────────────────────────────────────

    pub(crate) fn slots_mut(&mut self) -> &mut [ViewportSlot] {
        &mut self.slots
    }

    pub(crate) fn slots(&self) -> &[ViewportSlot] {
        &self.slots
    }

    /// Drop every playback clock so the next tick re-anchors them.
    pub(crate) fn reset_clocks(&mut self) {
        for slot in &mut self.slots {
            slot.clock = None;
        }
    }

    fn slot(&self, id: ViewportId) -> Option<&ViewportSlot> {
        self.index.get(&id).map(|&i| &self.slots[i])
    }

    fn slot_mut(&mut self, id: ViewportId) -> Option<&mut ViewportSlot> {
        self.index.get(&id).map(|&i| &mut self.slots[i])
    }
}

impl Default for ViewportManager {
    fn default() -> Self {
        Self::new()
    }
}
