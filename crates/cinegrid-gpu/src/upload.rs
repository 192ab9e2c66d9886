//! Out-of-band texture upload publishing.
//!
//! Decode and GPU upload for a not-yet-resident series happen on worker
//! threads; finished entries are published through a channel and drained by
//! the render tick. The tick itself never blocks on decode I/O.

use cinegrid_core::ViewportId;
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use tracing::debug;

use crate::residency::{ResidentEntry, TextureResource};

/// A finished upload waiting to be adopted into the residency cache.
pub struct PendingUpload<T> {
    pub viewport_id: ViewportId,
    pub entry: ResidentEntry<T>,
}

/// Worker-side handle for publishing finished uploads. Cheap to clone.
pub struct UploadSender<T> {
    tx: Sender<PendingUpload<T>>,
}

impl<T> Clone for UploadSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> UploadSender<T> {
    /// Publish a finished upload. Returns false if the engine side has
    /// shut down and the entry was dropped.
    pub fn publish(&self, viewport_id: ViewportId, entry: ResidentEntry<T>) -> bool {
        self.tx
            .send(PendingUpload { viewport_id, entry })
            .is_ok()
    }
}

/// Scheduler-side queue of published uploads.
pub struct UploadQueue<T> {
    tx: Sender<PendingUpload<T>>,
    rx: Receiver<PendingUpload<T>>,
}

impl<T: TextureResource> UploadQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Handle for decode/upload workers.
    pub fn sender(&self) -> UploadSender<T> {
        UploadSender {
            tx: self.tx.clone(),
        }
    }

    /// Take everything published since the last drain, without blocking.
    pub fn drain(&self) -> Vec<PendingUpload<T>> {
        let mut pending = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(upload) => pending.push(upload),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if !pending.is_empty() {
            debug!(count = pending.len(), "drained published uploads");
        }
        pending
    }
}

impl<T: TextureResource> Default for UploadQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
