//! Engine configuration.

use cinegrid_core::{memory_budget, CineGridError, Result, DEFAULT_MAX_DEVICE_PIXEL_RATIO};
use serde::{Deserialize, Serialize};

/// Caller-tunable engine settings, JSON round-trippable for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// GPU texture residency budget in bytes.
    pub texture_budget_bytes: usize,
    /// Upper bound applied to the host-reported device pixel ratio.
    pub max_device_pixel_ratio: f32,
    /// Number of tick samples in the stats smoothing window.
    pub stats_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            texture_budget_bytes: memory_budget::DEFAULT_TEXTURE_BUDGET,
            max_device_pixel_ratio: DEFAULT_MAX_DEVICE_PIXEL_RATIO,
            stats_window: memory_budget::STATS_WINDOW,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CineGridError::Serialization(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CineGridError::Serialization(e.to_string()))
    }
}
