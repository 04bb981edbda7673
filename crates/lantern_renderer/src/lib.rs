//! wgpu back end: specialized WGSL programs, texel grid uploads and the
//! render passes that run them.

use programs::{ClusterDrawData, ClusterProgram, GpuProgram};
use texture::TextureHelper;

pub mod error;
pub mod programs;
pub mod resources;
pub mod texture;

pub use error::RendererError;
pub use programs::{GpuProgramRenderContext, ProgramCache, ProgramKey, generate_wgsl};
pub use resources::{ClusterResources, GpuFrameUniforms, cluster_bind_group_layout};
pub use texture::{GpuTexelTexture, texture_format};

/// A device and queue with no surface attached.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    pub fn headless() -> Result<Self, RendererError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        // We use 'pollster' to block on the async requests
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;
        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))?;

        Ok(Self { device, queue })
    }

    pub fn render_context(&self) -> GpuProgramRenderContext<'_> {
        GpuProgramRenderContext {
            device: &self.device,
            queue: &self.queue,
            format: TextureHelper::COLOR_FORMAT,
        }
    }

    /// Records one draw of `program` into a fresh offscreen target and submits it.
    pub fn render_offscreen(
        &self,
        program: &ClusterProgram,
        data: ClusterDrawData<'_>,
        width: u32,
        height: u32,
    ) -> wgpu::Texture {
        let target = TextureHelper::create_color_target(&self.device, width, height, "Shading Target");
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = program
            .uses_depth()
            .then(|| TextureHelper::create_depth_texture(&self.device, width, height, "Depth Texture"));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Shading Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(match program.mode() {
                    lantern_core::ShadingMode::Deferred => "Deferred Shading Pass",
                    lantern_core::ShadingMode::ForwardPlus => "Forward+ Shading Pass",
                }),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: depth.as_ref().map(|depth| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view: depth,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0), // Clear to "Far" (1.0)
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                ..Default::default()
            });
            program.record(&mut render_pass, data);
        }
        self.queue.submit(Some(encoder.finish()));
        log::debug!("Submitted {} pass {width}x{height}", program.mode().label());
        target
    }

    /// Copies a `COLOR_FORMAT` target back to the host as tightly packed RGBA8 rows.
    pub fn read_back(&self, texture: &wgpu::Texture, width: u32, height: u32) -> Result<Vec<u8>, RendererError> {
        let padded_row = TextureHelper::padded_bytes_per_row(width);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: padded_row as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::PollType::wait_indefinitely())?;
        receiver.recv().map_err(|_| RendererError::ReadbackDropped)??;

        let row = (width * 4) as usize;
        let mut pixels = Vec::with_capacity(row * height as usize);
        {
            let mapped = slice.get_mapped_range();
            for chunk in mapped.chunks(padded_row as usize) {
                pixels.extend_from_slice(&chunk[..row]);
            }
        }
        buffer.unmap();
        Ok(pixels)
    }
}
