//! GPU texture management for decoded cine loops.

use cinegrid_core::{CineGridError, Result};

use crate::residency::TextureResource;

/// A GPU texture holding one decoded cine loop: a 2D array texture with one
/// layer per frame, RGBA8-normalized regardless of source bit depth.
pub struct FrameTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
}

impl FrameTexture {
    /// Create an array texture sized for a whole cine loop.
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        frame_count: u32,
        label: Option<&str>,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: frame_count.max(1),
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });

        Self {
            texture,
            view,
            width,
            height,
            frame_count: frame_count.max(1),
        }
    }

    /// Upload one decoded RGBA8 frame into its array layer.
    pub fn upload_frame(&self, queue: &wgpu::Queue, frame_index: u32, data: &[u8]) -> Result<()> {
        if frame_index >= self.frame_count {
            return Err(CineGridError::InvalidParameter(format!(
                "Frame {} out of range (0-{})",
                frame_index,
                self.frame_count - 1
            )));
        }

        let expected = (self.width * self.height * 4) as usize;
        if data.len() != expected {
            return Err(CineGridError::Gpu(format!(
                "Frame data is {} bytes, texture layer needs {}",
                data.len(),
                expected
            )));
        }

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: frame_index,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.width * 4),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        Ok(())
    }

    /// Memory footprint in bytes, normalized to 4 bytes/pixel.
    pub fn size_bytes(&self) -> usize {
        (self.width * self.height * self.frame_count) as usize * 4
    }
}

impl TextureResource for FrameTexture {
    fn dispose(&mut self) {
        self.texture.destroy();
    }
}
