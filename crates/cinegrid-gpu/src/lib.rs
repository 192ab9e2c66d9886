//! CineGrid GPU - shared-surface rendering layer
//!
//! One wgpu device and one blit pipeline serve every viewport slot. This
//! crate owns texture residency (LRU under a byte budget) and the
//! out-of-band upload path; it issues no draws of its own beyond the
//! region-restricted blit primitive.

pub mod blit;
pub mod context;
pub mod residency;
pub mod texture;
pub mod upload;

pub use blit::{BlitUniforms, RegionBlitPipeline, UNIFORM_STRIDE};
pub use context::GpuContext;
pub use residency::{
    calculate_vram_size, EvictedMeta, EvictionCallback, ResidentEntry, TextureResidencyCache,
    TextureResource,
};
pub use texture::FrameTexture;
pub use upload::{PendingUpload, UploadQueue, UploadSender};
