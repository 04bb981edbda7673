use glam::Mat4;
use lantern_core::{FrameUniforms, ShadingMode};
use wgpu::util::DeviceExt;

use crate::texture::GpuTexelTexture;

/// Frame constants as laid out in the program's uniform block.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuFrameUniforms {
    pub view: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4], // .w = padding
    pub viewport: [f32; 4],        // width, height, near, far
}

impl GpuFrameUniforms {
    pub fn new(uniforms: &FrameUniforms, projection: Mat4) -> Self {
        Self {
            view: uniforms.view.to_cols_array_2d(),
            view_proj: (projection * uniforms.view).to_cols_array_2d(),
            camera_position: uniforms.camera_position.extend(1.0).to_array(),
            viewport: [uniforms.width, uniforms.height, uniforms.near, uniforms.far],
        }
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            // Rgba32Float is not filterable without an extra feature.
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
        },
        count: None,
    }
}

/// Group 0: frame uniforms, light buffer, cluster buffer and the sampler
/// every texel read goes through.
pub fn cluster_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Cluster Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            texture_entry(1),
            texture_entry(2),
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                count: None,
            },
        ],
    })
}

/// Group 1: the G-buffer pair for deferred, the albedo and normal maps for
/// forward+.
pub fn surface_bind_group_layout(device: &wgpu::Device, mode: ShadingMode) -> wgpu::BindGroupLayout {
    let label = match mode {
        ShadingMode::Deferred => "G-Buffer Bind Group Layout",
        ShadingMode::ForwardPlus => "Material Bind Group Layout",
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[texture_entry(0), texture_entry(1)],
    })
}

/// Nearest, clamp-to-edge: texel buffers must never be blended.
pub fn create_texel_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Texel Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// Per-frame shared state: the uniform buffer and the group 0 layout.
pub struct ClusterResources {
    pub layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    frame_buffer: wgpu::Buffer,
}

impl ClusterResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let initial = GpuFrameUniforms {
            view: Mat4::IDENTITY.to_cols_array_2d(),
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            camera_position: [0.0; 4],
            viewport: [1.0, 1.0, 0.1, 100.0],
        };

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniform Buffer"),
            contents: bytemuck::cast_slice(&[initial]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            layout: cluster_bind_group_layout(device),
            sampler: create_texel_sampler(device),
            frame_buffer,
        }
    }

    /// Binds this frame's light and cluster textures.
    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        lights: &GpuTexelTexture,
        clusters: &GpuTexelTexture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cluster Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&lights.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&clusters.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Binds a pair of surface textures against a layout from
    /// [`surface_bind_group_layout`].
    pub fn surface_bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        first: &GpuTexelTexture,
        second: &GpuTexelTexture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Surface Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&first.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&second.view),
                },
            ],
        })
    }

    pub fn update_frame(&self, queue: &wgpu::Queue, uniforms: &FrameUniforms, projection: Mat4) {
        let data = GpuFrameUniforms::new(uniforms, projection);
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&data));
    }
}
