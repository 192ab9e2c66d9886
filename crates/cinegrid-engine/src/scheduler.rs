//! The shared animation clock and per-tick orchestration.
//!
//! One scheduler drives every viewport: it drains published uploads,
//! applies due layout resyncs, resolves all frame advances (including
//! sync-group propagation) and only then issues region-restricted draws
//! through the injected render callback. The scheduler holds no drawing
//! logic of its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{info, warn};

use cinegrid_core::{
    memory_budget, GpuRegion, PlaybackClock, Result, SeriesInfo, ViewportId, ViewportTransform,
    WindowLevel,
};
use cinegrid_gpu::{TextureResidencyCache, TextureResource, UploadQueue, UploadSender};

use crate::config::EngineConfig;
use crate::layout::LayoutProvider;
use crate::manager::ViewportManager;
use crate::stats::{RenderStats, RollingWindow};
use crate::sync::FrameSyncEngine;

/// Everything a draw delegate needs for one viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRequest {
    pub viewport_id: ViewportId,
    pub texture_unit: u32,
    pub frame_index: u32,
    pub region: GpuRegion,
    pub transform: ViewportTransform,
    pub window_level: Option<WindowLevel>,
    pub bit_depth: u8,
}

/// Issues the actual draw for one viewport. An error skips that viewport
/// for the tick; it never aborts the shared pass.
pub type RenderCallback = Box<dyn FnMut(&DrawRequest) -> Result<()> + Send>;

/// Notified after a viewport's frame position changes during a tick.
pub type FrameUpdateCallback = Box<dyn FnMut(ViewportId, u32) + Send>;

/// Asks the host to decode and re-publish a series after surface recovery.
pub type ResidencyRequestCallback = Box<dyn FnMut(ViewportId, &SeriesInfo) + Send>;

/// Clone-able control handle; the one safe way to start/stop the clock
/// from inside a scheduler callback.
#[derive(Clone)]
pub struct SchedulerHandle {
    running: Arc<AtomicBool>,
}

impl SchedulerHandle {
    /// Toggle the clock on.
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    /// Toggle the clock off. Safe at any time, re-entrantly included.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether ticks currently do work.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Owns the shared clock and the draw ordering for every viewport slot.
pub struct RenderScheduler<T: TextureResource> {
    manager: Arc<Mutex<ViewportManager>>,
    cache: Arc<Mutex<TextureResidencyCache<T>>>,
    sync: FrameSyncEngine,
    uploads: UploadQueue<T>,
    layout: Option<Box<dyn LayoutProvider + Send>>,
    render_cb: Option<RenderCallback>,
    frame_cb: Option<FrameUpdateCallback>,
    residency_cb: Option<ResidencyRequestCallback>,
    running: Arc<AtomicBool>,
    epoch: Instant,
    last_tick_ms: Option<f64>,
    tick_intervals: RollingWindow,
    tick_durations: RollingWindow,
    dropped_ticks: u64,
}

impl<T: TextureResource> RenderScheduler<T> {
    /// Create a scheduler over an existing manager and cache.
    pub fn new(
        manager: Arc<Mutex<ViewportManager>>,
        cache: Arc<Mutex<TextureResidencyCache<T>>>,
    ) -> Self {
        Self {
            manager,
            cache,
            sync: FrameSyncEngine::new(),
            uploads: UploadQueue::new(),
            layout: None,
            render_cb: None,
            frame_cb: None,
            residency_cb: None,
            running: Arc::new(AtomicBool::new(false)),
            epoch: Instant::now(),
            last_tick_ms: None,
            tick_intervals: RollingWindow::new(memory_budget::STATS_WINDOW),
            tick_durations: RollingWindow::new(memory_budget::STATS_WINDOW),
            dropped_ticks: 0,
        }
    }

    /// Create a scheduler plus its manager and cache from a config.
    pub fn with_config(config: &EngineConfig) -> Self {
        let manager = Arc::new(Mutex::new(ViewportManager::with_max_dpr(
            config.max_device_pixel_ratio,
        )));
        let cache = Arc::new(Mutex::new(TextureResidencyCache::new(
            config.texture_budget_bytes,
        )));
        let mut scheduler = Self::new(manager, cache);
        scheduler.tick_intervals = RollingWindow::new(config.stats_window);
        scheduler.tick_durations = RollingWindow::new(config.stats_window);
        scheduler
    }

    // ── Wiring ─────────────────────────────────────────────────

    /// Shared handle to the viewport manager.
    pub fn manager(&self) -> Arc<Mutex<ViewportManager>> {
        Arc::clone(&self.manager)
    }

    /// Shared handle to the residency cache.
    pub fn cache(&self) -> Arc<Mutex<TextureResidencyCache<T>>> {
        Arc::clone(&self.cache)
    }

    /// The sync engine owned by this scheduler.
    pub fn sync_engine(&self) -> &FrameSyncEngine {
        &self.sync
    }

    /// Mutable access for group management.
    pub fn sync_engine_mut(&mut self) -> &mut FrameSyncEngine {
        &mut self.sync
    }

    /// Handle for decode/upload workers to publish finished textures.
    pub fn upload_sender(&self) -> UploadSender<T> {
        self.uploads.sender()
    }

    /// Install the layout collaborator used for deferred resyncs.
    pub fn set_layout_provider(&mut self, layout: Box<dyn LayoutProvider + Send>) {
        self.layout = Some(layout);
    }

    /// Install the draw delegate.
    pub fn set_render_callback(&mut self, callback: RenderCallback) {
        self.render_cb = Some(callback);
    }

    /// Install the frame-change notification delegate.
    pub fn set_frame_update_callback(&mut self, callback: FrameUpdateCallback) {
        self.frame_cb = Some(callback);
    }

    /// Install the post-recovery residency request delegate.
    pub fn set_residency_request_callback(&mut self, callback: ResidencyRequestCallback) {
        self.residency_cb = Some(callback);
    }

    /// Control handle usable from inside callbacks.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            running: Arc::clone(&self.running),
        }
    }

    // ── Clock control ──────────────────────────────────────────

    /// Start the shared clock. Playback clocks re-anchor on the next tick,
    /// so a long pause never triggers a catch-up burst.
    pub fn start(&mut self) {
        if !self.running.swap(true, Ordering::SeqCst) {
            self.manager.lock().reset_clocks();
            self.last_tick_ms = None;
            info!("render clock started");
        }
    }

    /// Stop the shared clock. Safe at any time; state is preserved.
    pub fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("render clock stopped");
        }
    }

    /// Whether the clock is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ── Ticking ────────────────────────────────────────────────

    /// Tick using wall-clock time.
    pub fn tick(&mut self) {
        let now_ms = self.epoch.elapsed().as_secs_f64() * 1000.0;
        self.tick_at(now_ms);
    }

    /// One cooperative pass at the given timestamp (milliseconds on the
    /// scheduler's own monotonic axis). No-op while stopped.
    pub fn tick_at(&mut self, now_ms: f64) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        let tick_started = Instant::now();

        self.adopt_uploads();

        let mut frame_updates: SmallVec<[(ViewportId, u32); 8]> = SmallVec::new();
        let manager_handle = Arc::clone(&self.manager);
        let draw_list = {
            let mut manager = manager_handle.lock();

            if manager.take_due_resync() {
                if let Some(layout) = &self.layout {
                    manager.sync_all_slots(layout.as_ref());
                }
            }

            // Advance phase: every due frame, masters included, resolves
            // before any draw below.
            let mut master_advance: Option<(u32, u32)> = None;
            for slot in manager.slots_mut() {
                let Some(series) = &slot.series else {
                    continue;
                };
                if !slot.playback.is_playing {
                    continue;
                }
                // A ratio slave's position is owned by its master.
                if self.sync.is_ratio_slave(slot.id) {
                    continue;
                }
                let fps = slot.playback.fps;
                let clock = slot
                    .clock
                    .get_or_insert_with(|| PlaybackClock::new(fps, now_ms));
                if clock.advance_if_due(now_ms, series.frame_count) {
                    slot.playback.current_frame =
                        (slot.playback.current_frame + 1) % series.frame_count;
                    frame_updates.push((slot.id, slot.playback.current_frame));
                    if self.sync.is_master(slot.id) {
                        master_advance = Some((slot.playback.current_frame, series.frame_count));
                    }
                }
            }

            if let Some((frame, total)) = master_advance {
                for slave in self.sync.on_master_frame_advanced(frame, total, &mut manager) {
                    if let Some(view) = manager.viewport(slave) {
                        frame_updates.push((slave, view.playback.current_frame));
                    }
                }
            }

            self.collect_draws(&manager)
        };

        // Callbacks run outside the state locks; a delegate may use the
        // scheduler handle or the manager freely.
        self.execute_draws(&draw_list);
        if let Some(callback) = self.frame_cb.as_mut() {
            for (id, frame) in frame_updates {
                callback(id, frame);
            }
        }

        if let Some(last) = self.last_tick_ms {
            if now_ms > last {
                self.tick_intervals.push(now_ms - last);
            }
        }
        self.last_tick_ms = Some(now_ms);
        self.tick_durations
            .push(tick_started.elapsed().as_secs_f64() * 1000.0);
    }

    /// One full redraw pass without advancing any frame. Works while
    /// stopped, so property mutations are visible immediately.
    pub fn render_single_frame(&mut self) {
        self.adopt_uploads();
        let manager_handle = Arc::clone(&self.manager);
        let draw_list = {
            let manager = manager_handle.lock();
            self.collect_draws(&manager)
        };
        self.execute_draws(&draw_list);
    }

    /// Polled stats snapshot; recomputed on every call.
    pub fn stats(&self) -> RenderStats {
        let interval = self.tick_intervals.average();
        RenderStats {
            fps: if interval > 0.0 { 1000.0 / interval } else { 0.0 },
            frame_time_ms: self.tick_durations.average(),
            vram_usage_mb: self.cache.lock().vram_usage_mb(),
            dropped_ticks: self.dropped_ticks,
        }
    }

    // ── Surface loss recovery ──────────────────────────────────

    /// Tear down the drawing layer after the shared surface is lost.
    /// Viewport state is untouched; resident handles are dropped without
    /// disposal because they died with the surface.
    pub fn handle_surface_lost(&mut self) {
        warn!("shared surface lost; stopping clock and dropping residency bookkeeping");
        self.running.store(false, Ordering::SeqCst);
        self.cache.lock().clear_without_dispose();
    }

    /// Rebuild the drawing layer: schedule a layout resync, ask the host to
    /// re-publish every attached series, and restart the clock.
    pub fn handle_surface_restored(&mut self) {
        let requests: Vec<(ViewportId, SeriesInfo)> = {
            let mut manager = self.manager.lock();
            manager.mark_needs_sync();
            manager
                .slots()
                .iter()
                .filter_map(|slot| slot.series.clone().map(|series| (slot.id, series)))
                .collect()
        };
        info!(series = requests.len(), "shared surface restored; replaying viewport state");
        if let Some(callback) = self.residency_cb.as_mut() {
            for (id, series) in &requests {
                callback(*id, series);
            }
        }
        self.start();
    }

    /// Stop the clock and release every GPU resource. Idempotent.
    pub fn dispose(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        for upload in self.uploads.drain() {
            let mut entry = upload.entry;
            entry.resource.dispose();
        }
        self.cache.lock().clear();
    }

    // ── Internals ──────────────────────────────────────────────

    fn adopt_uploads(&mut self) {
        let pending = self.uploads.drain();
        if pending.is_empty() {
            return;
        }
        let mut cache = self.cache.lock();
        for upload in pending {
            cache.set(upload.viewport_id, upload.entry);
        }
    }

    fn collect_draws(&mut self, manager: &ViewportManager) -> Vec<DrawRequest> {
        let mut cache = self.cache.lock();
        let mut draws = Vec::new();
        for slot in manager.slots() {
            let Some(series) = &slot.series else {
                continue;
            };
            let Some(region) = slot.region else {
                continue;
            };
            if !region.is_drawable() {
                continue;
            }
            // Not resident yet: skip this viewport, touch nothing else.
            if cache.get(slot.id).is_none() {
                self.dropped_ticks += 1;
                continue;
            }
            draws.push(DrawRequest {
                viewport_id: slot.id,
                texture_unit: slot.texture_unit,
                frame_index: slot.playback.current_frame,
                region,
                transform: slot.transform,
                window_level: slot.window_level,
                bit_depth: series.bit_depth,
            });
        }
        draws
    }

    fn execute_draws(&mut self, draws: &[DrawRequest]) {
        let Some(callback) = self.render_cb.as_mut() else {
            return;
        };
        for draw in draws {
            if let Err(err) = callback(draw) {
                warn!(
                    viewport = %draw.viewport_id,
                    error = %err,
                    "draw failed; viewport skipped for this tick"
                );
            }
        }
    }
}
