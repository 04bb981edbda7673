use std::path::Path;

use lantern_core::{FrameUniforms, LanternError, ShadingMode};
use lantern_renderer::{
    ClusterResources, GpuContext, GpuTexelTexture, ProgramCache, ProgramKey,
    programs::{ClusterDrawData, ClusterProgram, GpuProgram},
};
use lantern_shading::{GBuffer, MaterialMaps};
use lantern_texel::{ClusterBuffer, LightBuffer};
use wgpu::util::DeviceExt;

use crate::{error::AppError, floor::floor_mesh, save_rgba, scene::SceneConfig};

/// Everything the GPU passes read, already encoded on the CPU.
pub struct GpuInputs<'a> {
    pub scene: &'a SceneConfig,
    pub uniforms: &'a FrameUniforms,
    pub lights: &'a LightBuffer,
    pub clusters: &'a ClusterBuffer,
    pub gbuffer: &'a GBuffer,
    pub maps: &'a MaterialMaps,
}

/// Compiles both program variants, uploads the texel grids, renders one
/// frame per mode and writes each to `out` as `<mode>_gpu.png`.
pub fn run(inputs: GpuInputs<'_>, config: lantern_core::ClusterConfig, out: &Path) -> Result<(), AppError> {
    let ctx = GpuContext::headless()?;
    let device = &ctx.device;
    let scene = inputs.scene;

    let mut cache = ProgramCache::new();
    let resources = ClusterResources::new(device);

    let light_texture = GpuTexelTexture::upload(device, &ctx.queue, inputs.lights.grid(), "Light Buffer");
    let cluster_texture = GpuTexelTexture::upload(device, &ctx.queue, inputs.clusters.grid(), "Cluster Buffer");
    let cluster_group = resources.bind_group(device, &light_texture, &cluster_texture);

    let aspect = scene.width as f32 / scene.height as f32;
    let projection = scene.camera.lens.compute_projection_matrix(aspect);
    resources.update_frame(&ctx.queue, inputs.uniforms, projection);

    for mode in [ShadingMode::Deferred, ShadingMode::ForwardPlus] {
        let key = ProgramKey::new(config, mode).with_specular(scene.specular);
        let module = cache.module(device, &key);
        let program = ClusterProgram::new(&ctx.render_context(), (&resources.layout, &module, mode));

        let target = match mode {
            ShadingMode::Deferred => {
                let [position, albedo] = inputs.gbuffer.targets() else {
                    return Err(LanternError::GBufferCount {
                        expected: 2,
                        found: inputs.gbuffer.target_count(),
                    }
                    .into());
                };
                let position = GpuTexelTexture::upload(device, &ctx.queue, position, "G-Buffer Position");
                let albedo = GpuTexelTexture::upload(device, &ctx.queue, albedo, "G-Buffer Albedo");
                let surface_group =
                    resources.surface_bind_group(device, &program.surface_layout, &position, &albedo);
                ctx.render_offscreen(
                    &program,
                    ClusterDrawData {
                        cluster_group: &cluster_group,
                        surface_group: &surface_group,
                        vertices: None,
                    },
                    scene.width,
                    scene.height,
                )
            }
            ShadingMode::ForwardPlus => {
                let albedo = GpuTexelTexture::upload(device, &ctx.queue, &inputs.maps.albedo, "Albedo Map");
                let normal = GpuTexelTexture::upload(device, &ctx.queue, &inputs.maps.normal, "Normal Map");
                let surface_group =
                    resources.surface_bind_group(device, &program.surface_layout, &albedo, &normal);

                let mesh = floor_mesh(&scene.floor);
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Floor Vertex Buffer"),
                    contents: bytemuck::cast_slice(&mesh),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                ctx.render_offscreen(
                    &program,
                    ClusterDrawData {
                        cluster_group: &cluster_group,
                        surface_group: &surface_group,
                        vertices: Some((&vertex_buffer, mesh.len() as u32)),
                    },
                    scene.width,
                    scene.height,
                )
            }
        };

        let pixels = ctx.read_back(&target, scene.width, scene.height)?;
        save_rgba(&pixels, scene.width, scene.height, out, &format!("{}_gpu.png", mode.label()))?;
    }

    log::info!(
        "GPU: {} program sources, {} shader modules",
        cache.source_count(),
        cache.module_count()
    );
    Ok(())
}
