//! Cine playback state and the drift-free frame clock.
//!
//! Frame intervals are held as rational milliseconds (`1000/fps` is not
//! representable in binary floating point for most rates). Advancing a frame
//! consumes exactly one interval from the clock's anchor instead of
//! resetting to the current time, so irregular tick timing never
//! accumulates into systematic playback drift.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};

/// Lowest accepted playback rate.
pub const MIN_FPS: u32 = 1;
/// Highest accepted playback rate.
pub const MAX_FPS: u32 = 60;

/// Clamp a requested playback rate into `[MIN_FPS, MAX_FPS]`.
#[inline]
pub fn clamp_fps(fps: u32) -> u32 {
    fps.clamp(MIN_FPS, MAX_FPS)
}

/// Playback state for one viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playback {
    /// Current frame index into the attached series.
    pub current_frame: u32,
    /// Frames per second, always within `[MIN_FPS, MAX_FPS]`.
    pub fps: u32,
    /// Whether this viewport's cine loop is running.
    pub is_playing: bool,
}

impl Playback {
    /// Milliseconds per frame at the current rate.
    #[inline]
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.fps as f64
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            current_frame: 0,
            fps: 30,
            is_playing: false,
        }
    }
}

/// Per-viewport frame-advance clock.
///
/// The clock tracks an anchor timestamp and the number of whole intervals
/// consumed since then. A frame is due once
/// `now - anchor >= interval * (consumed + 1)`; advancing consumes one
/// interval. If the backlog ever exceeds one full loop of the series the
/// clock re-anchors, so a long stall slows playback instead of triggering
/// an unbounded catch-up burst.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    anchor_ms: f64,
    consumed: i64,
    interval_ms: Rational64,
}

impl PlaybackClock {
    /// Create a clock anchored at `now_ms`, ticking at `fps` (clamped).
    pub fn new(fps: u32, now_ms: f64) -> Self {
        Self {
            anchor_ms: now_ms,
            consumed: 0,
            interval_ms: Rational64::new(1000, clamp_fps(fps) as i64),
        }
    }

    /// Change the rate, re-anchoring at `now_ms` so the new interval takes
    /// effect from the next frame.
    pub fn set_fps(&mut self, fps: u32, now_ms: f64) {
        self.interval_ms = Rational64::new(1000, clamp_fps(fps) as i64);
        self.reanchor(now_ms);
    }

    /// Restart interval accounting from `now_ms`.
    pub fn reanchor(&mut self, now_ms: f64) {
        self.anchor_ms = now_ms;
        self.consumed = 0;
    }

    /// Milliseconds per frame.
    #[inline]
    pub fn interval_ms(&self) -> f64 {
        rational_to_f64(self.interval_ms)
    }

    /// Timestamp at which the next frame becomes due.
    #[inline]
    pub fn next_due_ms(&self) -> f64 {
        self.anchor_ms + rational_to_f64(self.interval_ms * (self.consumed + 1))
    }

    /// If a frame is due at `now_ms`, consume one interval and return true.
    ///
    /// `loop_frames` is the length of the viewport's cine loop, used only
    /// for the backlog re-anchor bound.
    pub fn advance_if_due(&mut self, now_ms: f64, loop_frames: u32) -> bool {
        if now_ms < self.next_due_ms() {
            return false;
        }
        self.consumed += 1;

        // Stalled longer than one full loop: re-anchor rather than replay it.
        let backlog_ms = now_ms - self.next_due_ms();
        let loop_ms = rational_to_f64(self.interval_ms * loop_frames.max(1) as i64);
        if backlog_ms > loop_ms {
            self.reanchor(now_ms);
        }
        true
    }
}

#[inline]
fn rational_to_f64(r: Rational64) -> f64 {
    *r.numer() as f64 / *r.denom() as f64
}
