//! Integration tests for proportional playback synchronization.

use cinegrid_engine::{
    slave_frame_for, FrameSyncEngine, SyncGroupSpec, SyncMode, ViewportManager,
};

use cinegrid_core::SeriesInfo;

// ── Helpers ────────────────────────────────────────────────────

fn series(frame_count: u32) -> SeriesInfo {
    SeriesInfo {
        series_id: format!("loop-{frame_count}"),
        image_width: 640,
        image_height: 480,
        frame_count,
        bit_depth: 8,
        is_encapsulated: true,
    }
}

// ── Ratio formula ──────────────────────────────────────────────

#[test]
fn ratio_midpoint_maps_proportionally() {
    // round(50 / 99 * 49) = 25
    assert_eq!(slave_frame_for(50, 100, 50), 25);
}

#[test]
fn ratio_endpoints_pin_to_loop_edges() {
    assert_eq!(slave_frame_for(0, 100, 50), 0);
    assert_eq!(slave_frame_for(99, 100, 50), 49);
}

#[test]
fn ratio_expands_into_longer_slave_loops() {
    assert_eq!(slave_frame_for(10, 20, 120), 63); // round(10/19 * 119)
}

#[test]
fn single_frame_slave_stays_at_zero() {
    assert_eq!(slave_frame_for(42, 100, 1), 0);
    assert_eq!(slave_frame_for(42, 1, 50), 0);
}

// ── Group behavior through the manager ─────────────────────────

#[test]
fn master_advance_drives_all_slaves() {
    let mut manager = ViewportManager::new();
    let ids = manager.create_slots(4);
    manager.set_viewport_series(ids[0], series(100));
    for &id in &ids[1..] {
        manager.set_viewport_series(id, series(50));
    }

    let mut engine = FrameSyncEngine::new();
    engine.create_sync_group(SyncGroupSpec {
        master: ids[0],
        slaves: ids[1..].to_vec(),
        mode: SyncMode::FrameRatio,
    });

    engine.on_master_frame_advanced(50, 100, &mut manager);
    for &id in &ids[1..] {
        assert_eq!(manager.viewport(id).unwrap().playback.current_frame, 25);
    }
}

#[test]
fn replacing_group_releases_previous_slaves() {
    let mut manager = ViewportManager::new();
    let ids = manager.create_slots(3);
    for &id in &ids {
        manager.set_viewport_series(id, series(50));
    }

    let mut engine = FrameSyncEngine::new();
    engine.create_sync_group(SyncGroupSpec {
        master: ids[0],
        slaves: vec![ids[1]],
        mode: SyncMode::FrameRatio,
    });
    engine.create_sync_group(SyncGroupSpec {
        master: ids[0],
        slaves: vec![ids[2]],
        mode: SyncMode::FrameRatio,
    });

    engine.on_master_frame_advanced(49, 50, &mut manager);

    // Only the current group's slave moves.
    assert_eq!(manager.viewport(ids[1]).unwrap().playback.current_frame, 0);
    assert_eq!(manager.viewport(ids[2]).unwrap().playback.current_frame, 49);
}

#[test]
fn clearing_groups_restores_independence() {
    let mut manager = ViewportManager::new();
    let ids = manager.create_slots(2);
    manager.set_viewport_series(ids[0], series(100));
    manager.set_viewport_series(ids[1], series(50));

    let mut engine = FrameSyncEngine::new();
    engine.create_sync_group(SyncGroupSpec {
        master: ids[0],
        slaves: vec![ids[1]],
        mode: SyncMode::FrameRatio,
    });
    engine.clear_all_groups();

    engine.on_master_frame_advanced(50, 100, &mut manager);
    assert_eq!(manager.viewport(ids[1]).unwrap().playback.current_frame, 0);
}

#[test]
fn sync_positions_always_inside_slave_loop() {
    let mut manager = ViewportManager::new();
    let ids = manager.create_slots(2);
    manager.set_viewport_series(ids[0], series(100));
    manager.set_viewport_series(ids[1], series(7));

    let mut engine = FrameSyncEngine::new();
    engine.create_sync_group(SyncGroupSpec {
        master: ids[0],
        slaves: vec![ids[1]],
        mode: SyncMode::FrameRatio,
    });

    for master_frame in 0..100 {
        engine.on_master_frame_advanced(master_frame, 100, &mut manager);
        let slave = manager.viewport(ids[1]).unwrap().playback.current_frame;
        assert!(slave < 7, "slave frame {slave} out of range");
    }
}

#[test]
fn mode_strings_convert_at_the_boundary() {
    assert_eq!("frameRatio".parse::<SyncMode>().unwrap(), SyncMode::FrameRatio);
    assert_eq!("manual".parse::<SyncMode>().unwrap(), SyncMode::Manual);
    assert!("".parse::<SyncMode>().is_err());
}
