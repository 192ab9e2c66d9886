//! Derived render statistics.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Fixed-capacity rolling average over the most recent samples.
#[derive(Debug, Clone)]
pub(crate) struct RollingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Polled snapshot of scheduler health. Derived and read-only; recomputed
/// on every read, never authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderStats {
    /// Smoothed ticks per second of the shared clock.
    pub fps: f64,
    /// Smoothed per-tick processing time in milliseconds.
    pub frame_time_ms: f64,
    /// Resident texture memory in megabytes.
    pub vram_usage_mb: f64,
    /// Viewport draws skipped because their texture was not yet resident.
    pub dropped_ticks: u64,
}
