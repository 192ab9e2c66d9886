//! Region-restricted blit pipeline.
//!
//! One render pipeline serves every viewport slot. Each draw binds the
//! slot's array texture and a 256-aligned slice of the shared uniform
//! buffer, then restricts its effects with `set_viewport` and
//! `set_scissor_rect` so no slot can paint outside its region.

use bytemuck::{Pod, Zeroable};
use cinegrid_core::{GpuRegion, ViewportTransform, WindowLevel};

use crate::texture::FrameTexture;

/// Uniform buffer stride; wgpu requires 256-byte alignment for dynamic
/// offsets.
pub const UNIFORM_STRIDE: u64 = 256;

const SHADER: &str = r#"
struct BlitUniforms {
    transform: vec4<f32>,
    pan_ndc: vec2<f32>,
    window: vec2<f32>,
    layer: vec4<u32>,
}

@group(0) @binding(0) var<uniform> u: BlitUniforms;
@group(1) @binding(0) var frames: texture_2d_array<f32>;
@group(1) @binding(1) var frame_sampler: sampler;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VsOut {
    var corners = array<vec2<f32>, 4>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(-1.0, 1.0),
        vec2<f32>(1.0, 1.0),
    );
    var uvs = array<vec2<f32>, 4>(
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 0.0),
    );
    let m = mat2x2<f32>(u.transform.xy, u.transform.zw);
    var out: VsOut;
    out.pos = vec4<f32>(m * corners[vi] + u.pan_ndc, 0.0, 1.0);
    out.uv = uvs[vi];
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let s = textureSampleLevel(frames, frame_sampler, in.uv, i32(u.layer.x), 0.0);
    let g = clamp((s.r - u.window.x) * u.window.y, 0.0, 1.0);
    return vec4<f32>(g, g, g, 1.0);
}
"#;

/// Per-draw uniforms; layout mirrors the WGSL struct.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct BlitUniforms {
    /// Column-major 2x2 transform: zoom, rotation, flips.
    pub transform: [f32; 4],
    /// Pan offset in NDC units.
    pub pan_ndc: [f32; 2],
    /// Window lower bound and inverse range, in normalized sample units.
    pub window: [f32; 2],
    /// x holds the frame layer; the rest is padding.
    pub layer: [u32; 4],
}

impl BlitUniforms {
    /// Build draw uniforms for one slot.
    ///
    /// `bit_depth` is the source bit depth the window values are expressed
    /// in; samples arrive normalized to `[0, 1]` over that range.
    pub fn for_slot(
        transform: &ViewportTransform,
        window: WindowLevel,
        bit_depth: u8,
        frame_layer: u32,
        region: GpuRegion,
    ) -> Self {
        let (sin, cos) = transform.rotation_radians().sin_cos();
        let sx = transform.zoom * if transform.flip_h { -1.0 } else { 1.0 };
        let sy = transform.zoom * if transform.flip_v { -1.0 } else { 1.0 };

        let max_val = ((1u32 << bit_depth.clamp(1, 16) as u32) - 1) as f32;
        let pan_x = if region.width > 0.0 {
            2.0 * transform.pan.x / region.width
        } else {
            0.0
        };
        // Layout pan is y-down, NDC is y-up.
        let pan_y = if region.height > 0.0 {
            -2.0 * transform.pan.y / region.height
        } else {
            0.0
        };

        Self {
            transform: [cos * sx, sin * sx, -sin * sy, cos * sy],
            pan_ndc: [pan_x, pan_y],
            window: [window.lower() / max_val, max_val / window.width],
            layer: [frame_layer, 0, 0, 0],
        }
    }
}

/// The shared blit pipeline and its uniform storage.
pub struct RegionBlitPipeline {
    pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    capacity: u32,
}

impl RegionBlitPipeline {
    /// Create the pipeline for a surface of the given format, with uniform
    /// space for `max_slots` viewports.
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, max_slots: u32) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Region Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<BlitUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Region Blit Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Region Blit Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let capacity = max_slots.max(1);
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Blit Uniforms"),
            size: UNIFORM_STRIDE * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<BlitUniforms>() as u64),
                }),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Blit Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        Self {
            pipeline,
            texture_layout,
            sampler,
            uniform_buffer,
            uniform_bind_group,
            capacity,
        }
    }

    /// Number of slots the uniform buffer can hold.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Write one slot's uniforms into its buffer slice.
    pub fn write_uniforms(&self, queue: &wgpu::Queue, slot_index: u32, uniforms: &BlitUniforms) {
        debug_assert!(slot_index < self.capacity);
        queue.write_buffer(
            &self.uniform_buffer,
            slot_index as u64 * UNIFORM_STRIDE,
            bytemuck::bytes_of(uniforms),
        );
    }

    /// Create the per-series texture bind group.
    pub fn texture_bind_group(
        &self,
        device: &wgpu::Device,
        texture: &FrameTexture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Draw one slot, restricted to its region.
    pub fn draw<'pass>(
        &'pass self,
        pass: &mut wgpu::RenderPass<'pass>,
        slot_index: u32,
        texture_bind_group: &'pass wgpu::BindGroup,
        region: GpuRegion,
    ) {
        if !region.is_drawable() || slot_index >= self.capacity {
            return;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_viewport(region.x, region.y, region.width, region.height, 0.0, 1.0);
        pass.set_scissor_rect(
            region.x.max(0.0) as u32,
            region.y.max(0.0) as u32,
            region.width as u32,
            region.height as u32,
        );
        let offset = (slot_index as u64 * UNIFORM_STRIDE) as u32;
        pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
        pass.set_bind_group(1, texture_bind_group, &[]);
        pass.draw(0..4, 0..1);
    }
}
