//! Series metadata as reported by the external decoded-frame source.

use serde::{Deserialize, Serialize};

use crate::transform::WindowLevel;

/// Metadata for one multi-frame image series.
///
/// Pixel data itself never passes through this type; the decode collaborator
/// hands frames straight to the GPU upload path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesInfo {
    /// Opaque series identifier from the frame source.
    pub series_id: String,
    /// Frame width in pixels.
    pub image_width: u32,
    /// Frame height in pixels.
    pub image_height: u32,
    /// Number of frames in the cine loop.
    pub frame_count: u32,
    /// Stored bits per sample (8, 10, 12, 16).
    pub bit_depth: u8,
    /// Whether the source pixel data was transfer-syntax encapsulated
    /// (e.g. JPEG multi-frame) before decode.
    pub is_encapsulated: bool,
}

impl SeriesInfo {
    /// Highest valid frame index, or 0 for an empty/degenerate series.
    #[inline]
    pub fn last_frame(&self) -> u32 {
        self.frame_count.saturating_sub(1)
    }

    /// Clamp a frame index into this series' valid range.
    #[inline]
    pub fn clamp_frame(&self, frame: u32) -> u32 {
        frame.min(self.last_frame())
    }

    /// A full-range window for the series bit depth: center `2^(n-1)`,
    /// width `2^n`. Applied when the host attaches a series without an
    /// explicit window.
    pub fn default_window_level(&self) -> WindowLevel {
        let full = (1u32 << self.bit_depth.clamp(1, 16) as u32) as f32;
        WindowLevel {
            center: full / 2.0,
            width: full,
        }
    }
}
