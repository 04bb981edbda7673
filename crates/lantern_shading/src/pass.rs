use std::time::Instant;

use glam::Vec2;
use lantern_core::{ClusterConfig, FrameUniforms, LIGHT_TEXTURE_HEIGHT, LanternError, ShadingMode};
use lantern_texel::{ClusterBuffer, LightBuffer};
use rayon::prelude::*;

use crate::{
    ClusterShader, SpecularAccumulation,
    surface::{ForwardTarget, GBuffer, MaterialMaps},
};

/// Color of pixels no fragment covered.
const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Per-fragment surface input for one frame.
#[derive(Clone, Copy, Debug)]
pub enum SurfaceSource<'s> {
    Deferred(&'s GBuffer),
    ForwardPlus {
        target: &'s ForwardTarget,
        maps: &'s MaterialMaps,
    },
}

impl SurfaceSource<'_> {
    fn mode(&self) -> ShadingMode {
        match self {
            SurfaceSource::Deferred(_) => ShadingMode::Deferred,
            SurfaceSource::ForwardPlus { .. } => ShadingMode::ForwardPlus,
        }
    }

    fn size(&self) -> (u32, u32) {
        match self {
            SurfaceSource::Deferred(gbuffer) => (gbuffer.width(), gbuffer.height()),
            SurfaceSource::ForwardPlus { target, .. } => (target.width(), target.height()),
        }
    }
}

/// Shaded output, row-major with row 0 at the top.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[f32; 4]>,
}

impl Frame {
    pub fn pixel(&self, column: u32, row: u32) -> [f32; 4] {
        self.pixels[(row * self.width + column) as usize]
    }

    /// 8-bit RGBA, clamped.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| p.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect()
    }
}

/// One shading pass over a full frame.
///
/// Construction checks the buffers against the configuration; after that every
/// fragment is evaluated independently and in parallel, reading the shared
/// buffers only.
pub struct FramePass<'a> {
    mode: ShadingMode,
    shader: ClusterShader<'a>,
}

impl<'a> FramePass<'a> {
    pub fn new(
        config: ClusterConfig,
        mode: ShadingMode,
        lights: &'a LightBuffer,
        clusters: &'a ClusterBuffer,
    ) -> Result<Self, LanternError> {
        config.validate()?;
        lights
            .grid()
            .expect_size("light buffer", config.light_texture_width(), LIGHT_TEXTURE_HEIGHT)?;
        clusters.grid().expect_size(
            "cluster buffer",
            config.cluster_texture_width(),
            config.cluster_texture_height(),
        )?;

        Ok(Self {
            mode,
            shader: ClusterShader::new(config, lights, clusters),
        })
    }

    pub fn with_specular(mut self, specular: SpecularAccumulation) -> Self {
        self.shader = self.shader.with_specular(specular);
        self
    }

    pub fn mode(&self) -> ShadingMode {
        self.mode
    }

    /// Shades every pixel of `source`.
    pub fn shade(&self, uniforms: &FrameUniforms, source: SurfaceSource<'_>) -> Result<Frame, LanternError> {
        if source.mode() != self.mode {
            return Err(LanternError::ModeMismatch {
                expected: self.mode.label(),
                found: source.mode().label(),
            });
        }
        if let SurfaceSource::Deferred(gbuffer) = source {
            let expected = self.shader.config().num_gbuffers;
            if gbuffer.target_count() != expected as usize {
                return Err(LanternError::GBufferCount {
                    expected,
                    found: gbuffer.target_count(),
                });
            }
        }

        let (width, height) = source.size();
        if width != uniforms.width as u32 || height != uniforms.height as u32 {
            return Err(LanternError::GBufferSize {
                width: uniforms.width as u32,
                height: uniforms.height as u32,
                found_width: width,
                found_height: height,
            });
        }

        let started = Instant::now();
        let mut pixels = vec![CLEAR_COLOR; (width as usize) * (height as usize)];
        pixels
            .par_chunks_mut(width.max(1) as usize)
            .enumerate()
            .for_each(|(row, out)| {
                let row = row as u32;
                for (column, pixel) in out.iter_mut().enumerate() {
                    let column = column as u32;
                    // Window coordinates: pixel centers, origin at the bottom left.
                    let frag_coord = Vec2::new(column as f32 + 0.5, (height - row) as f32 - 0.5);
                    let color = match source {
                        SurfaceSource::Deferred(gbuffer) => {
                            let uv = Vec2::new(
                                (column as f32 + 0.5) / width as f32,
                                (row as f32 + 0.5) / height as f32,
                            );
                            Some(self.shader.shade_deferred(uniforms, frag_coord, &gbuffer.sample(uv)))
                        }
                        SurfaceSource::ForwardPlus { target, maps } => target
                            .get(column, row)
                            .map(|fragment| self.shader.shade_forward(uniforms, frag_coord, fragment, maps)),
                    };
                    if let Some(color) = color {
                        *pixel = color.to_array();
                    }
                }
            });

        log::info!(
            "{} pass shaded {}x{} in {:.2?}",
            self.mode.label(),
            width,
            height,
            started.elapsed()
        );
        Ok(Frame {
            width,
            height,
            pixels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_texel::{ClusterAssignment, ExhaustiveAssigner, LightAssigner, LightRecord, TexelFormat};
    use glam::{Mat4, Vec3};

    fn config() -> ClusterConfig {
        ClusterConfig {
            num_gbuffers: 2,
            num_lights: 2,
            x_slices: 2,
            y_slices: 2,
            z_slices: 2,
            max_lights: 2,
        }
    }

    fn lights() -> Vec<LightRecord> {
        vec![
            LightRecord::new(Vec3::new(0.0, 0.0, -3.0), 10.0, Vec3::ONE),
            LightRecord::new(Vec3::new(1.0, 1.0, -3.0), 10.0, Vec3::new(0.5, 0.2, 0.1)),
        ]
    }

    fn uniforms(width: u32, height: u32) -> FrameUniforms {
        FrameUniforms {
            view: Mat4::IDENTITY,
            near: 1.0,
            far: 10.0,
            width: width as f32,
            height: height as f32,
            camera_position: Vec3::ZERO,
        }
    }

    #[test]
    fn rejects_buffers_built_for_another_configuration() {
        let small = config();
        let lights = LightBuffer::encode(&small, TexelFormat::Rgba32Float, &lights()).unwrap();
        let clusters = ClusterBuffer::encode(
            &small,
            TexelFormat::Rgba32Float,
            &ClusterAssignment::new(small.cluster_count()),
        )
        .unwrap();

        let bigger = ClusterConfig { x_slices: 3, ..small };
        let err = FramePass::new(bigger, ShadingMode::Deferred, &lights, &clusters)
            .err()
            .unwrap();
        assert_eq!(
            err,
            LanternError::DimensionMismatch {
                buffer: "cluster buffer",
                expected_width: 12,
                expected_height: 2,
                found_width: 8,
                found_height: 2,
            }
        );
    }

    #[test]
    fn rejects_surface_input_of_the_other_mode() {
        let config = config();
        let light_list = lights();
        let lights = LightBuffer::encode(&config, TexelFormat::Rgba32Float, &light_list).unwrap();
        let clusters = ClusterBuffer::encode(
            &config,
            TexelFormat::Rgba32Float,
            &ExhaustiveAssigner.assign(&config, &light_list),
        )
        .unwrap();
        let pass = FramePass::new(config, ShadingMode::ForwardPlus, &lights, &clusters).unwrap();
        let gbuffer = GBuffer::new(4, 4, TexelFormat::Rgba32Float);
        let err = pass
            .shade(&uniforms(4, 4), SurfaceSource::Deferred(&gbuffer))
            .unwrap_err();
        assert!(matches!(err, LanternError::ModeMismatch { .. }));
    }

    #[test]
    fn uncovered_forward_pixels_keep_clear_color() {
        let config = config();
        let light_list = lights();
        let lights = LightBuffer::encode(&config, TexelFormat::Rgba32Float, &light_list).unwrap();
        let clusters = ClusterBuffer::encode(
            &config,
            TexelFormat::Rgba32Float,
            &ExhaustiveAssigner.assign(&config, &light_list),
        )
        .unwrap();
        let pass = FramePass::new(config, ShadingMode::ForwardPlus, &lights, &clusters).unwrap();
        let target = ForwardTarget::new(3, 2);
        let maps = MaterialMaps::flat(Vec3::ONE, TexelFormat::Rgba8Unorm);
        let frame = pass
            .shade(&uniforms(3, 2), SurfaceSource::ForwardPlus { target: &target, maps: &maps })
            .unwrap();
        assert!(frame.pixels.iter().all(|p| *p == CLEAR_COLOR));
    }

    #[test]
    fn viewport_must_match_surface_input() {
        let config = config();
        let light_list = lights();
        let lights = LightBuffer::encode(&config, TexelFormat::Rgba32Float, &light_list).unwrap();
        let clusters = ClusterBuffer::encode(
            &config,
            TexelFormat::Rgba32Float,
            &ExhaustiveAssigner.assign(&config, &light_list),
        )
        .unwrap();
        let pass = FramePass::new(config, ShadingMode::Deferred, &lights, &clusters).unwrap();
        let gbuffer = GBuffer::new(4, 4, TexelFormat::Rgba32Float);
        let err = pass
            .shade(&uniforms(8, 4), SurfaceSource::Deferred(&gbuffer))
            .unwrap_err();
        assert!(matches!(err, LanternError::GBufferSize { .. }));
    }

    #[test]
    fn to_rgba8_clamps() {
        let frame = Frame {
            width: 1,
            height: 1,
            pixels: vec![[2.0, -1.0, 0.5, 1.0]],
        };
        assert_eq!(frame.to_rgba8(), vec![255, 0, 128, 255]);
    }
}
