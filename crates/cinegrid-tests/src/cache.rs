//! Integration tests for texture residency under memory pressure.
//!
//! Exercises eviction policy CPU-side only — no actual GPU required.

use cinegrid_core::ViewportId;
use cinegrid_gpu::{calculate_vram_size, ResidentEntry, TextureResidencyCache, TextureResource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Helpers ────────────────────────────────────────────────────

struct CountingTexture {
    disposed: Arc<AtomicUsize>,
}

impl TextureResource for CountingTexture {
    fn dispose(&mut self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

/// A 512x512 loop of `frames` frames; 512*512*4 = ~1 MB per frame.
fn loop_entry(disposed: &Arc<AtomicUsize>, frames: u32) -> ResidentEntry<CountingTexture> {
    ResidentEntry::new(
        CountingTexture {
            disposed: Arc::clone(disposed),
        },
        "1.2.840.113619.2.1",
        512,
        512,
        frames,
    )
}

fn frame_bytes(frames: u32) -> usize {
    calculate_vram_size(512, 512, frames)
}

// ── Eviction order ─────────────────────────────────────────────

#[test]
fn lru_evicts_least_recently_touched() {
    let disposed = Arc::new(AtomicUsize::new(0));
    // Budget fits exactly two 30-frame loops.
    let mut cache = TextureResidencyCache::new(2 * frame_bytes(30));
    let (a, b, c) = (ViewportId::new(), ViewportId::new(), ViewportId::new());

    cache.set(a, loop_entry(&disposed, 30));
    cache.set(b, loop_entry(&disposed, 30));

    // Touch order A, B, A leaves B least recently used when C arrives.
    cache.get(a);
    cache.get(b);
    cache.get(a);
    cache.set(c, loop_entry(&disposed, 30));

    assert!(cache.contains(a), "A was recently used and must survive");
    assert!(!cache.contains(b), "B was LRU and must be evicted");
    assert!(cache.contains(c), "the new entry is always resident");
}

#[test]
fn eviction_frees_gpu_resources_exactly_once() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let mut cache = TextureResidencyCache::new(frame_bytes(30));

    for _ in 0..5 {
        cache.set(ViewportId::new(), loop_entry(&disposed, 30));
    }

    assert_eq!(cache.len(), 1);
    assert_eq!(disposed.load(Ordering::SeqCst), 4);
}

// ── Budget invariant & oversized entries ───────────────────────

#[test]
fn budget_invariant_or_single_oversized_entry() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let budget = 3 * frame_bytes(30);
    let mut cache = TextureResidencyCache::new(budget);

    // Mixed loop sizes, including one larger than the whole budget.
    for frames in [30, 60, 30, 200, 30, 90, 30] {
        cache.set(ViewportId::new(), loop_entry(&disposed, frames));
        let within_budget = cache.resident_bytes() <= budget;
        assert!(
            within_budget || cache.len() == 1,
            "Σ={} budget={} len={}",
            cache.resident_bytes(),
            budget,
            cache.len()
        );
    }
}

#[test]
fn oversized_entry_accepted_on_empty_cache_without_callback() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let budget = frame_bytes(30);
    let mut cache = TextureResidencyCache::new(budget);

    let evictions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evictions);
    cache.set_eviction_callback(Box::new(move |id, meta| {
        sink.lock().unwrap().push((id, meta.clone()));
    }));

    let a = ViewportId::new();
    cache.set(a, loop_entry(&disposed, 120)); // 4x the budget

    assert!(cache.contains(a));
    let expected_mb = frame_bytes(120) as f64 / 1e6;
    assert!((cache.vram_usage_mb() - expected_mb).abs() < 1e-9);
    assert!(
        evictions.lock().unwrap().is_empty(),
        "exceeding the budget with a single entry is not an eviction"
    );
}

#[test]
fn eviction_callback_reports_displaced_series() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let mut cache = TextureResidencyCache::new(frame_bytes(30));

    let evictions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evictions);
    cache.set_eviction_callback(Box::new(move |id, meta| {
        sink.lock().unwrap().push((id, meta.clone()));
    }));

    let a = ViewportId::new();
    cache.set(a, loop_entry(&disposed, 30));
    cache.set(ViewportId::new(), loop_entry(&disposed, 30));

    let evictions = evictions.lock().unwrap();
    assert_eq!(evictions.len(), 1);
    assert_eq!(evictions[0].0, a);
    assert_eq!(evictions[0].1.frame_count, 30);
    assert_eq!(evictions[0].1.size_bytes, frame_bytes(30));
}

// ── Surface loss ───────────────────────────────────────────────

#[test]
fn clear_without_dispose_never_touches_dead_handles() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let mut cache = TextureResidencyCache::new(10 * frame_bytes(30));
    for _ in 0..4 {
        cache.set(ViewportId::new(), loop_entry(&disposed, 30));
    }

    cache.clear_without_dispose();

    assert!(cache.is_empty());
    assert_eq!(cache.vram_usage_mb(), 0.0);
    assert_eq!(
        disposed.load(Ordering::SeqCst),
        0,
        "handles invalidated by surface loss must not be destroyed"
    );
}

#[test]
fn vram_size_formula_normalizes_to_four_bytes() {
    // 640x480, 30 frames, regardless of source bit depth.
    assert_eq!(calculate_vram_size(640, 480, 30), 640 * 480 * 30 * 4);
}
