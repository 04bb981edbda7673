use std::mem;

use bytemuck::{Pod, Zeroable};
use lantern_core::ShadingMode;
use wgpu::RenderPipeline;

use crate::{
    programs::{GpuProgram, GpuProgramRenderContext},
    resources::surface_bind_group_layout,
    texture::TextureHelper,
};

/// Vertex of forward-rasterized geometry.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ForwardVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl ForwardVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ForwardVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3, // position
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: (mem::size_of::<[f32; 3]>() * 2) as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

pub struct ClusterProgram {
    mode: ShadingMode,
    pipeline: RenderPipeline,
    pub surface_layout: wgpu::BindGroupLayout,
}

pub struct ClusterDrawData<'a> {
    /// Group 0, see [`crate::resources::ClusterResources::bind_group`].
    pub cluster_group: &'a wgpu::BindGroup,
    /// Group 1: G-buffer pair or material maps.
    pub surface_group: &'a wgpu::BindGroup,
    /// Forward+ geometry. Ignored by deferred, which draws one full-screen triangle.
    pub vertices: Option<(&'a wgpu::Buffer, u32)>,
}

impl ClusterProgram {
    pub fn mode(&self) -> ShadingMode {
        self.mode
    }

    pub fn uses_depth(&self) -> bool {
        self.mode == ShadingMode::ForwardPlus
    }
}

impl GpuProgram for ClusterProgram {
    type InitData<'a> = (&'a wgpu::BindGroupLayout, &'a wgpu::ShaderModule, ShadingMode);
    type DrawData<'a> = ClusterDrawData<'a>;

    fn new(ctx: &GpuProgramRenderContext, init_data: Self::InitData<'_>) -> Self {
        let (cluster_layout, shader, mode) = init_data;
        let surface_layout = surface_bind_group_layout(ctx.device, mode);

        let layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Cluster Pipeline Layout"),
                bind_group_layouts: &[cluster_layout, &surface_layout],
                push_constant_ranges: &[],
            });

        let forward_buffers = [ForwardVertex::desc()];
        let (buffers, depth_stencil, cull_mode) = match mode {
            ShadingMode::Deferred => (&[][..], None, None),
            ShadingMode::ForwardPlus => (
                &forward_buffers[..],
                Some(wgpu::DepthStencilState {
                    format: TextureHelper::DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less, // Closer pixels win
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                Some(wgpu::Face::Back),
            ),
        };

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                cache: None,
                label: Some(match mode {
                    ShadingMode::Deferred => "Deferred Cluster Pipeline",
                    ShadingMode::ForwardPlus => "Forward+ Cluster Pipeline",
                }),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                depth_stencil,
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });

        Self {
            mode,
            pipeline,
            surface_layout,
        }
    }

    fn record<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, data: Self::DrawData<'a>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, data.cluster_group, &[]);
        render_pass.set_bind_group(1, data.surface_group, &[]);

        match (self.mode, data.vertices) {
            (ShadingMode::Deferred, _) => render_pass.draw(0..3, 0..1),
            (ShadingMode::ForwardPlus, Some((buffer, count))) => {
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(0..count, 0..1);
            }
            (ShadingMode::ForwardPlus, None) => {
                log::warn!("Forward+ draw recorded without geometry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_vertex_attributes_are_packed() {
        let desc = ForwardVertex::desc();
        assert_eq!(desc.array_stride, 32);
        let offsets: Vec<_> = desc.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 12, 24]);
    }
}
