//! CineGrid Engine - viewport management, synchronization, and scheduling
//!
//! The three collaborators here follow a strict one-directional dependency
//! order: `RenderScheduler` holds the `ViewportManager` and residency cache
//! plus its own `FrameSyncEngine`; none of them hold back-references, and
//! callbacks are plain function values passed in.

pub mod config;
pub mod layout;
pub mod manager;
pub mod scheduler;
pub mod stats;
pub mod sync;
pub mod viewport;

pub use config::EngineConfig;
pub use layout::{LayoutProvider, StaticLayout};
pub use manager::ViewportManager;
pub use scheduler::{
    DrawRequest, FrameUpdateCallback, RenderCallback, RenderScheduler, ResidencyRequestCallback,
    SchedulerHandle,
};
pub use stats::RenderStats;
pub use sync::{slave_frame_for, FrameSyncEngine, SyncGroup, SyncGroupSpec, SyncMode};
pub use viewport::ViewportSnapshot;
