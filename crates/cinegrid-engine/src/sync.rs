//! Proportional master/slave playback synchronization.

use cinegrid_core::{CineGridError, ViewportId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::str::FromStr;
use tracing::info;

use crate::manager::ViewportManager;

/// How slave frame positions track the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncMode {
    /// Slaves follow the master proportionally through their own loop.
    #[default]
    FrameRatio,
    /// Grouping only; positions are left to the host.
    Manual,
}

impl FromStr for SyncMode {
    type Err = CineGridError;

    /// Convert an external string representation at the boundary.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frameRatio" | "frame_ratio" | "frame-ratio" => Ok(Self::FrameRatio),
            "manual" => Ok(Self::Manual),
            other => Err(CineGridError::InvalidParameter(format!(
                "Unknown sync mode: {other}"
            ))),
        }
    }
}

/// Requested group membership.
#[derive(Debug, Clone)]
pub struct SyncGroupSpec {
    pub master: ViewportId,
    pub slaves: Vec<ViewportId>,
    pub mode: SyncMode,
}

/// The single active master/slave group.
#[derive(Debug, Clone)]
pub struct SyncGroup {
    pub master: ViewportId,
    pub slaves: SmallVec<[ViewportId; 4]>,
    pub mode: SyncMode,
}

/// Enforces master→slave proportional frame relationships.
///
/// Holds only group membership; frame positions live in the
/// `ViewportManager`, which is passed in when a master advance propagates.
#[derive(Debug, Default)]
pub struct FrameSyncEngine {
    group: Option<SyncGroup>,
}

impl FrameSyncEngine {
    /// Create an engine with no active group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a group, replacing any existing one. The master is removed
    /// from the slave set if listed there; duplicate slaves collapse.
    pub fn create_sync_group(&mut self, spec: SyncGroupSpec) {
        let mut slaves: SmallVec<[ViewportId; 4]> = SmallVec::new();
        for slave in spec.slaves {
            if slave != spec.master && !slaves.contains(&slave) {
                slaves.push(slave);
            }
        }
        info!(master = %spec.master, slaves = slaves.len(), mode = ?spec.mode, "sync group installed");
        self.group = Some(SyncGroup {
            master: spec.master,
            slaves,
            mode: spec.mode,
        });
    }

    /// Drop synchronization; all viewports resume independent playback.
    pub fn clear_all_groups(&mut self) {
        if self.group.take().is_some() {
            info!("sync group cleared");
        }
    }

    /// The active group, if any.
    pub fn group(&self) -> Option<&SyncGroup> {
        self.group.as_ref()
    }

    /// Whether `id` is the active master.
    pub fn is_master(&self, id: ViewportId) -> bool {
        self.group.as_ref().is_some_and(|g| g.master == id)
    }

    /// Whether `id` is a slave whose position is currently overridden.
    pub fn is_ratio_slave(&self, id: ViewportId) -> bool {
        self.group
            .as_ref()
            .is_some_and(|g| g.mode == SyncMode::FrameRatio && g.slaves.contains(&id))
    }

    /// Propagate a master advance to every slave. Returns the slaves whose
    /// positions were recomputed, so the caller can emit frame
    /// notifications. Positions are written before any draw this tick.
    pub fn on_master_frame_advanced(
        &self,
        master_frame: u32,
        master_total: u32,
        manager: &mut ViewportManager,
    ) -> SmallVec<[ViewportId; 4]> {
        let mut updated = SmallVec::new();
        let Some(group) = &self.group else {
            return updated;
        };
        if group.mode != SyncMode::FrameRatio {
            return updated;
        }

        for &slave in &group.slaves {
            let Some(view) = manager.viewport(slave) else {
                continue;
            };
            let Some(series) = view.series else {
                continue;
            };
            let frame = slave_frame_for(master_frame, master_total, series.frame_count);
            manager.set_viewport_frame(slave, frame);
            updated.push(slave);
        }
        updated
    }
}

/// Proportional mapping of a master frame into a slave's loop:
/// `round(master_frame / (master_total-1) * (slave_total-1))`, clamped.
/// Degenerate loops (one frame or fewer on either side) map to 0.
pub fn slave_frame_for(master_frame: u32, master_total: u32, slave_total: u32) -> u32 {
    if master_total <= 1 || slave_total <= 1 {
        return 0;
    }
    let ratio = master_frame as f64 / (master_total - 1) as f64;
    let frame = (ratio * (slave_total - 1) as f64).round() as u32;
    frame.min(slave_total - 1)
}
