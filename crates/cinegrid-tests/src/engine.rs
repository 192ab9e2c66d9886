//! End-to-end engine tests: slots, scheduling, residency, and recovery
//! working together across crates.

use std::sync::{Arc, Mutex};

use cinegrid_core::{RectPx, SeriesInfo, ViewportId};
use cinegrid_engine::{
    EngineConfig, RenderScheduler, StaticLayout, SyncGroupSpec, SyncMode,
};
use cinegrid_gpu::{ResidentEntry, TextureResource};

// ── Helpers ────────────────────────────────────────────────────

struct StubTexture;

impl TextureResource for StubTexture {
    fn dispose(&mut self) {}
}

fn trace_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("cinegrid=debug")
        .with_test_writer()
        .try_init();
}

fn echo_series(frame_count: u32) -> SeriesInfo {
    SeriesInfo {
        series_id: "1.2.840.10008.5.1.4.1.1.3.1".to_string(),
        image_width: 640,
        image_height: 480,
        frame_count,
        bit_depth: 8,
        is_encapsulated: true,
    }
}

fn resident(frame_count: u32) -> ResidentEntry<StubTexture> {
    ResidentEntry::new(StubTexture, "echo", 640, 480, frame_count)
}

/// A 2x2 study grid on a 1280x1024 surface, every slot resident.
///
/// Four 300-frame loops total ~1.5 GB, so the budget is raised above the
/// default to keep them all resident at once.
fn grid() -> (RenderScheduler<StubTexture>, Vec<ViewportId>) {
    trace_init();
    let config = EngineConfig {
        texture_budget_bytes: 2 * 1024 * 1024 * 1024,
        ..EngineConfig::default()
    };
    let mut scheduler = RenderScheduler::with_config(&config);
    let manager = scheduler.manager();
    let ids = {
        let mut manager = manager.lock();
        manager.set_surface_size(1280.0, 1024.0);
        manager.set_device_pixel_ratio(1.0);
        let ids = manager.create_slots(4);
        let mut layout = StaticLayout::new();
        for (i, &id) in ids.iter().enumerate() {
            manager.set_viewport_series(id, echo_series(300));
            let col = (i % 2) as f32;
            let row = (i / 2) as f32;
            layout.place(id, RectPx::new(col * 640.0, row * 512.0, 640.0, 512.0));
        }
        manager.sync_all_slots(&layout);
        ids
    };
    let cache = scheduler.cache();
    for &id in &ids {
        cache.lock().set(id, resident(300));
    }
    (scheduler, ids)
}

fn run_ticks(scheduler: &mut RenderScheduler<StubTexture>, duration_ms: f64, hz: f64) {
    let step = 1000.0 / hz;
    let ticks = (duration_ms / step).round() as u32;
    for i in 0..=ticks {
        scheduler.tick_at(i as f64 * step);
    }
}

// ── Slot allocation ────────────────────────────────────────────

#[test]
fn create_slots_yields_distinct_ids_and_units() {
    let (scheduler, ids) = grid();
    let views = scheduler.manager().lock().all_viewports();

    assert_eq!(views.len(), 4);
    for (i, view) in views.iter().enumerate() {
        assert_eq!(view.id, ids[i], "snapshots come back in creation order");
    }

    let mut units: Vec<u32> = views.iter().map(|v| v.texture_unit).collect();
    units.sort_unstable();
    assert_eq!(units, vec![0, 1, 2, 3]);

    let mut sorted_ids = ids.clone();
    sorted_ids.sort_by_key(|id| format!("{id}"));
    sorted_ids.dedup();
    assert_eq!(sorted_ids.len(), 4);
}

// ── Coordinate mapping ─────────────────────────────────────────

#[test]
fn layout_rect_maps_to_flipped_gpu_region() {
    let (scheduler, ids) = grid();
    let manager = scheduler.manager();
    {
        let mut manager = manager.lock();
        manager.set_surface_size(2560.0, 1000.0);
        manager.set_device_pixel_ratio(2.0);
        let mut layout = StaticLayout::new();
        layout.place(ids[0], RectPx::new(100.0, 50.0, 200.0, 150.0));
        manager.sync_slot(ids[0], &layout);
    }

    let region = manager.lock().viewport(ids[0]).unwrap().region.unwrap();
    assert_eq!(region.x, 200.0);
    assert_eq!(region.y, 700.0);
    assert_eq!(region.width, 400.0);
    assert_eq!(region.height, 300.0);
}

// ── Playback scheduling ────────────────────────────────────────

#[test]
fn one_second_at_thirty_fps_advances_thirty_frames() {
    let (mut scheduler, ids) = grid();
    let manager = scheduler.manager();
    {
        let mut manager = manager.lock();
        manager.set_viewport_playing(ids[0], true);
        manager.set_viewport_fps(ids[0], 30);
    }

    scheduler.start();
    run_ticks(&mut scheduler, 1000.0, 60.0);

    let manager = manager.lock();
    assert_eq!(manager.viewport(ids[0]).unwrap().playback.current_frame, 30);
    for &id in &ids[1..] {
        assert_eq!(
            manager.viewport(id).unwrap().playback.current_frame,
            0,
            "independent viewports must not move"
        );
    }
}

#[test]
fn per_viewport_rates_tick_independently() {
    let (mut scheduler, ids) = grid();
    let manager = scheduler.manager();
    {
        let mut manager = manager.lock();
        for (&id, fps) in ids.iter().zip([10u32, 20, 40, 60]) {
            manager.set_viewport_fps(id, fps);
            manager.set_viewport_playing(id, true);
        }
    }

    scheduler.start();
    run_ticks(&mut scheduler, 1000.0, 120.0);

    let manager = manager.lock();
    for (&id, expected) in ids.iter().zip([10u32, 20, 40, 60]) {
        assert_eq!(
            manager.viewport(id).unwrap().playback.current_frame,
            expected
        );
    }
}

#[test]
fn frame_invariant_holds_throughout_playback() {
    let (mut scheduler, ids) = grid();
    let manager = scheduler.manager();
    {
        let mut manager = manager.lock();
        manager.set_viewport_series(ids[0], echo_series(7));
        manager.set_viewport_playing(ids[0], true);
        manager.set_viewport_fps(ids[0], 60);
    }

    scheduler.start();
    let step = 1000.0 / 90.0;
    for i in 0..=360u32 {
        scheduler.tick_at(i as f64 * step);
        let frame = manager.lock().viewport(ids[0]).unwrap().playback.current_frame;
        assert!(frame < 7, "frame {frame} escaped the loop");
    }
}

// ── Synchronized playback ──────────────────────────────────────

#[test]
fn grouped_viewports_advance_proportionally() {
    let (mut scheduler, ids) = grid();
    let manager = scheduler.manager();
    {
        let mut manager = manager.lock();
        manager.set_viewport_series(ids[0], echo_series(100));
        manager.set_viewport_series(ids[1], echo_series(50));
        manager.set_viewport_playing(ids[0], true);
        manager.set_viewport_fps(ids[0], 50);
    }
    {
        let cache = scheduler.cache();
        let mut cache = cache.lock();
        cache.set(ids[0], resident(100));
        cache.set(ids[1], resident(50));
    }
    scheduler.sync_engine_mut().create_sync_group(SyncGroupSpec {
        master: ids[0],
        slaves: vec![ids[1]],
        mode: SyncMode::FrameRatio,
    });

    scheduler.start();
    run_ticks(&mut scheduler, 1000.0, 120.0);

    let manager = manager.lock();
    let master = manager.viewport(ids[0]).unwrap().playback.current_frame;
    let slave = manager.viewport(ids[1]).unwrap().playback.current_frame;
    assert_eq!(master, 50);
    assert_eq!(slave, 25);
}

// ── Residency behavior under the tick ──────────────────────────

#[test]
fn published_upload_becomes_drawable_next_tick() {
    let (mut scheduler, ids) = grid();
    scheduler.cache().lock().delete_and_dispose(ids[2]);

    let drawn: Arc<Mutex<Vec<ViewportId>>> = Arc::default();
    let sink = Arc::clone(&drawn);
    scheduler.set_render_callback(Box::new(move |draw| {
        sink.lock().unwrap().push(draw.viewport_id);
        Ok(())
    }));

    scheduler.start();
    scheduler.tick_at(0.0);
    assert!(!drawn.lock().unwrap().contains(&ids[2]));

    // A decode worker publishes the texture off-thread.
    let sender = scheduler.upload_sender();
    let published_id = ids[2];
    std::thread::spawn(move || sender.publish(published_id, resident(300)))
        .join()
        .unwrap();

    drawn.lock().unwrap().clear();
    scheduler.tick_at(5.0);
    assert!(drawn.lock().unwrap().contains(&ids[2]));
}

#[test]
fn eviction_notification_reaches_diagnostics() {
    let (scheduler, ids) = grid();
    let notifications: Arc<Mutex<Vec<ViewportId>>> = Arc::default();
    let sink = Arc::clone(&notifications);

    let cache = scheduler.cache();
    {
        let mut cache = cache.lock();
        cache.set_eviction_callback(Box::new(move |id, _meta| {
            sink.lock().unwrap().push(id);
        }));
    }

    // Shrink effective capacity by inserting a loop that dwarfs the rest.
    cache
        .lock()
        .set(ids[0], ResidentEntry::new(StubTexture, "huge", 4096, 4096, 120));

    let notified = notifications.lock().unwrap();
    assert!(!notified.is_empty());
    assert!(!notified.contains(&ids[0]), "the inserted entry itself is never evicted");
}

// ── Surface loss ───────────────────────────────────────────────

#[test]
fn surface_loss_preserves_viewport_state_and_replays() {
    let (mut scheduler, ids) = grid();
    let manager = scheduler.manager();
    {
        let mut manager = manager.lock();
        manager.set_viewport_zoom(ids[1], 3.0);
        manager.set_viewport_frame(ids[1], 123);
        manager.set_viewport_playing(ids[0], true);
    }

    let requested: Arc<Mutex<Vec<ViewportId>>> = Arc::default();
    let sink = Arc::clone(&requested);
    scheduler.set_residency_request_callback(Box::new(move |id, series| {
        assert_eq!(series.image_width, 640);
        sink.lock().unwrap().push(id);
    }));

    scheduler.start();
    scheduler.handle_surface_lost();

    assert!(!scheduler.is_running());
    assert_eq!(scheduler.cache().lock().len(), 0);

    scheduler.handle_surface_restored();
    assert!(scheduler.is_running());
    assert_eq!(requested.lock().unwrap().len(), 4);

    // Transform/playback state replayed untouched into the rebuilt layer.
    let view = manager.lock().viewport(ids[1]).unwrap();
    assert_eq!(view.transform.zoom, 3.0);
    assert_eq!(view.playback.current_frame, 123);
}

// ── Stats ──────────────────────────────────────────────────────

#[test]
fn stats_snapshot_reports_vram_and_cadence() {
    let (mut scheduler, _ids) = grid();
    scheduler.start();
    run_ticks(&mut scheduler, 1000.0, 60.0);

    let stats = scheduler.stats();
    assert!((stats.fps - 60.0).abs() < 2.0, "fps = {}", stats.fps);
    // Four 640x480x300 loops ≈ 1.47 GB reported in MB.
    let expected_mb = 4.0 * (640.0 * 480.0 * 300.0 * 4.0) / 1e6;
    assert!((stats.vram_usage_mb - expected_mb).abs() < 1.0);
}
