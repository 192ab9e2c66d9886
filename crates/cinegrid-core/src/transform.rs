//! Per-viewport display transform and grayscale window.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Pan/zoom/rotation/flip state for one viewport.
///
/// Applied at draw time inside the slot's region; never baked into the
/// uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    /// Pan offset in device pixels, relative to the slot center.
    pub pan: Vec2,
    /// Uniform zoom factor; 1.0 fits the series to the slot.
    pub zoom: f32,
    /// Clockwise rotation in degrees.
    pub rotation_degrees: f32,
    /// Horizontal mirror.
    pub flip_h: bool,
    /// Vertical mirror.
    pub flip_v: bool,
}

impl ViewportTransform {
    /// Identity: no pan, unit zoom, no rotation, no flips.
    pub const IDENTITY: Self = Self {
        pan: Vec2::ZERO,
        zoom: 1.0,
        rotation_degrees: 0.0,
        flip_h: false,
        flip_v: false,
    };

    /// Smallest zoom accepted by the validated setter.
    pub const MIN_ZOOM: f32 = 0.05;
    /// Largest zoom accepted by the validated setter.
    pub const MAX_ZOOM: f32 = 40.0;

    /// Clamp a requested zoom into the accepted range. Non-finite input
    /// falls back to 1.0.
    #[inline]
    pub fn clamp_zoom(zoom: f32) -> f32 {
        if zoom.is_finite() {
            zoom.clamp(Self::MIN_ZOOM, Self::MAX_ZOOM)
        } else {
            1.0
        }
    }

    /// Rotation in radians, for uniform upload.
    #[inline]
    pub fn rotation_radians(&self) -> f32 {
        self.rotation_degrees.to_radians()
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Grayscale window (center/width) applied during draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowLevel {
    pub center: f32,
    pub width: f32,
}

impl WindowLevel {
    /// Create a window, forcing width to at least 1 so the draw shader
    /// never divides by zero.
    pub fn new(center: f32, width: f32) -> Self {
        Self {
            center,
            width: width.max(1.0),
        }
    }

    /// Lower bound of the window.
    #[inline]
    pub fn lower(&self) -> f32 {
        self.center - self.width / 2.0
    }

    /// Upper bound of the window.
    #[inline]
    pub fn upper(&self) -> f32 {
        self.center + self.width / 2.0
    }
}
