//! CineGrid Core - Foundation types for the multi-viewport cine engine
//!
//! This crate provides the fundamental types used throughout CineGrid:
//! - Layout/draw-region geometry and the y-flip mapping between them
//! - Series metadata from the external decoded-frame source
//! - Viewport transform and grayscale window state
//! - Cine playback state and the drift-free frame clock

pub mod error;
pub mod geometry;
pub mod id;
pub mod playback;
pub mod series;
pub mod transform;

pub use error::{CineGridError, Result};
pub use id::ViewportId;
pub use geometry::{
    clamp_device_pixel_ratio, gpu_region_for_rect, GpuRegion, RectPx, Vec2,
    DEFAULT_MAX_DEVICE_PIXEL_RATIO,
};
pub use playback::{clamp_fps, Playback, PlaybackClock, MAX_FPS, MIN_FPS};
pub use series::SeriesInfo;
pub use transform::{ViewportTransform, WindowLevel};

/// Memory budget constants for a shared GPU surface serving many viewports.
pub mod memory_budget {
    /// Default GPU texture residency budget.
    pub const DEFAULT_TEXTURE_BUDGET: usize = 512 * 1024 * 1024; // 512 MB

    /// A 640x480 8-bit echo loop of 30 frames, normalized to RGBA8
    /// (~37 MB); the default budget holds roughly a dozen of them.
    pub const TYPICAL_ECHO_LOOP_BYTES: usize = 640 * 480 * 30 * 4;

    /// Number of tick samples in the stats smoothing window.
    pub const STATS_WINDOW: usize = 60;
}
