//! GPU texture residency tracking under a byte budget.
//!
//! One resident entry per viewport, LRU-evicted when the budget is
//! exceeded. A single entry larger than the whole budget is still accepted:
//! the alternative is a viewport that can never display its series.

use std::collections::HashMap;

use cinegrid_core::ViewportId;
use smallvec::SmallVec;
use tracing::{debug, warn};

/// The disposal seam between cache bookkeeping and the GPU resource.
///
/// `dispose` is called exactly once when an entry is evicted, replaced,
/// deleted, or cleared. The exception is `clear_without_dispose`, where the
/// underlying handles are already invalid.
pub trait TextureResource {
    /// Free the underlying GPU resource.
    fn dispose(&mut self);
}

/// A resident cine loop and its bookkeeping metadata.
pub struct ResidentEntry<T> {
    pub resource: T,
    pub series_id: String,
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
    pub size_bytes: usize,
}

impl<T> ResidentEntry<T> {
    /// Create an entry; `size_bytes` is derived from the dimensions.
    pub fn new(
        resource: T,
        series_id: impl Into<String>,
        width: u32,
        height: u32,
        frame_count: u32,
    ) -> Self {
        Self {
            resource,
            series_id: series_id.into(),
            width,
            height,
            frame_count,
            size_bytes: calculate_vram_size(width, height, frame_count),
        }
    }
}

/// Metadata handed to the eviction callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictedMeta {
    pub series_id: String,
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
    pub size_bytes: usize,
}

/// Diagnostics callback invoked for each entry evicted under budget
/// pressure. Not invoked for replacements, explicit deletes, or an
/// oversized entry that merely exceeds the budget on its own.
pub type EvictionCallback = Box<dyn FnMut(ViewportId, &EvictedMeta) + Send>;

/// VRAM cost of a cine loop: `width * height * frame_count * 4`, normalized
/// to 4 bytes/pixel regardless of source bit depth.
#[inline]
pub fn calculate_vram_size(width: u32, height: u32, frame_count: u32) -> usize {
    width as usize * height as usize * frame_count as usize * 4
}

/// LRU cache of resident cine-loop textures, keyed by viewport.
///
/// Generic over the resource so eviction logic runs in tests without a GPU
/// device; production code uses `FrameTexture`.
pub struct TextureResidencyCache<T: TextureResource> {
    entries: HashMap<ViewportId, ResidentEntry<T>>,
    /// LRU order, most recently used last.
    lru_order: Vec<ViewportId>,
    resident_bytes: usize,
    budget_bytes: usize,
    on_evict: Option<EvictionCallback>,
}

impl<T: TextureResource> TextureResidencyCache<T> {
    /// Create a cache with the given byte budget.
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru_order: Vec::new(),
            resident_bytes: 0,
            budget_bytes,
            on_evict: None,
        }
    }

    /// Install the eviction diagnostics callback.
    pub fn set_eviction_callback(&mut self, callback: EvictionCallback) {
        self.on_evict = Some(callback);
    }

    /// Budget in bytes.
    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    /// Whether a viewport has a resident texture (does not touch LRU order).
    pub fn contains(&self, id: ViewportId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Get the resident entry for a viewport and mark it most recently used.
    pub fn get(&mut self, id: ViewportId) -> Option<&ResidentEntry<T>> {
        if self.entries.contains_key(&id) {
            self.lru_order.retain(|&other| other != id);
            self.lru_order.push(id);
            self.entries.get(&id)
        } else {
            None
        }
    }

    /// Insert or replace the entry for a viewport.
    ///
    /// Any prior entry for the same viewport is disposed first, silently:
    /// replacement is not eviction. Least-recently-used entries are then
    /// evicted until the new entry fits the budget or stands alone; each
    /// eviction disposes the resource and fires the callback.
    pub fn set(&mut self, id: ViewportId, entry: ResidentEntry<T>) {
        if let Some(mut prior) = self.entries.remove(&id) {
            self.resident_bytes -= prior.size_bytes;
            self.lru_order.retain(|&other| other != id);
            prior.resource.dispose();
        }

        let incoming = entry.size_bytes;
        if incoming > self.budget_bytes {
            warn!(
                viewport = %id,
                size_bytes = incoming,
                budget_bytes = self.budget_bytes,
                "single series exceeds the entire texture budget; accepting anyway"
            );
        }

        // Snapshot victims before mutating so the callback can never observe
        // a half-updated LRU list.
        let mut victims: SmallVec<[ViewportId; 4]> = SmallVec::new();
        let mut projected = self.resident_bytes;
        for &candidate in &self.lru_order {
            if projected + incoming <= self.budget_bytes {
                break;
            }
            projected -= self.entries[&candidate].size_bytes;
            victims.push(candidate);
        }

        for victim in victims {
            self.evict(victim);
        }

        self.resident_bytes += incoming;
        self.lru_order.push(id);
        self.entries.insert(id, entry);
    }

    /// Remove and dispose one entry immediately. Unknown id is a no-op.
    pub fn delete_and_dispose(&mut self, id: ViewportId) {
        if let Some(mut entry) = self.entries.remove(&id) {
            self.resident_bytes -= entry.size_bytes;
            self.lru_order.retain(|&other| other != id);
            entry.resource.dispose();
        }
    }

    /// Dispose and remove every entry.
    pub fn clear(&mut self) {
        for (_, mut entry) in self.entries.drain() {
            entry.resource.dispose();
        }
        self.lru_order.clear();
        self.resident_bytes = 0;
    }

    /// Drop all bookkeeping without disposing resources.
    ///
    /// Used exactly once, during shared-surface loss recovery: the handles
    /// are already invalid and must not be destroyed through a dead device.
    pub fn clear_without_dispose(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.lru_order.clear();
        self.resident_bytes = 0;
        if dropped > 0 {
            debug!(dropped, "dropped residency bookkeeping after surface loss");
        }
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total resident bytes.
    pub fn resident_bytes(&self) -> usize {
        self.resident_bytes
    }

    /// Resident megabytes, recomputed from the entries on every read.
    pub fn vram_usage_mb(&self) -> f64 {
        let bytes: usize = self.entries.values().map(|e| e.size_bytes).sum();
        bytes as f64 / 1e6
    }

    fn evict(&mut self, id: ViewportId) {
        let Some(mut entry) = self.entries.remove(&id) else {
            return;
        };
        self.resident_bytes -= entry.size_bytes;
        self.lru_order.retain(|&other| other != id);
        entry.resource.dispose();

        let meta = EvictedMeta {
            series_id: entry.series_id.clone(),
            width: entry.width,
            height: entry.height,
            frame_count: entry.frame_count,
            size_bytes: entry.size_bytes,
        };
        debug!(viewport = %id, size_bytes = meta.size_bytes, "evicted resident texture");
        if let Some(callback) = self.on_evict.as_mut() {
            callback(id, &meta);
        }
    }
}
