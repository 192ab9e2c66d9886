//! Geometric primitives and the layout-rect to draw-region mapping.
//!
//! Slot rectangles arrive from the host layout system in device pixels with
//! a top-left origin (y-down). The shared GPU surface draws with a
//! bottom-left origin (y-up), so every synced rectangle is flipped and
//! scaled by the device pixel ratio before it becomes a draw region.

use bytemuck::{Pod, Zeroable};
use glam::Vec2 as GlamVec2;
use serde::{Deserialize, Serialize};

/// 2D vector.
pub type Vec2 = GlamVec2;

/// Upper bound applied to the device pixel ratio unless the caller overrides
/// it. Bounds texture memory and fill-rate on high-density displays.
pub const DEFAULT_MAX_DEVICE_PIXEL_RATIO: f32 = 2.0;

/// An on-screen slot rectangle in device pixels, origin top-left, y-down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct RectPx {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl RectPx {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Bottom edge (y-down, so top + height).
    #[inline]
    pub fn bottom(self) -> f32 {
        self.top + self.height
    }

    /// Right edge.
    #[inline]
    pub fn right(self) -> f32 {
        self.left + self.width
    }

    /// Whether the rectangle has positive area.
    #[inline]
    pub fn is_visible(self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// A draw region on the shared GPU surface, origin bottom-left, y-up.
///
/// Used for both `set_viewport` and `set_scissor_rect` so one draw call's
/// effects stay inside a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct GpuRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl GpuRegion {
    /// Create a new region.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the region has positive area.
    #[inline]
    pub fn is_drawable(self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Clamp a reported device pixel ratio into `(0, max_dpr]`.
///
/// A non-positive ratio (bogus host report) falls back to 1.
#[inline]
pub fn clamp_device_pixel_ratio(dpr: f32, max_dpr: f32) -> f32 {
    if dpr <= 0.0 {
        1.0
    } else {
        dpr.min(max_dpr)
    }
}

/// Map a layout rectangle to its GPU draw region.
///
/// `surface_height_px` is the full height of the shared surface in device
/// pixels; the y axis flips around it:
///
/// ```text
/// region.x      = rect.left * dpr
/// region.y      = surface_height_px - rect.bottom() * dpr
/// region.width  = rect.width * dpr
/// region.height = rect.height * dpr
/// ```
pub fn gpu_region_for_rect(rect: RectPx, dpr: f32, surface_height_px: f32) -> GpuRegion {
    GpuRegion {
        x: rect.left * dpr,
        y: surface_height_px - rect.bottom() * dpr,
        width: rect.width * dpr,
        height: rect.height * dpr,
    }
}
