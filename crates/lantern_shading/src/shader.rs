use glam::{Vec2, Vec3, Vec4};
use lantern_cluster::ClusterLocator;
use lantern_core::{ClusterConfig, FrameUniforms};
use lantern_texel::{ClusterBuffer, LightBuffer};
use serde::{Deserialize, Serialize};

use crate::{
    cubic_gaussian,
    surface::{ForwardFragment, GBufferTexel, MaterialMaps, SurfaceSample},
};

pub const AMBIENT_LIGHT: Vec3 = Vec3::splat(0.025);
pub const SPECULAR_EXPONENT: f32 = 500.0;

/// What the forward+ specular highlight is added to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecularAccumulation {
    /// Into the albedo accumulator, before the diffuse multiply. The tint
    /// persists for every later light and for the ambient term.
    #[default]
    IntoAlbedo,
    /// Into a separate accumulator added after diffuse and ambient.
    Separate,
}

/// Shades single fragments against one frame's light and cluster buffers.
#[derive(Clone, Copy, Debug)]
pub struct ClusterShader<'a> {
    config: ClusterConfig,
    locator: ClusterLocator,
    lights: &'a LightBuffer,
    clusters: &'a ClusterBuffer,
    specular: SpecularAccumulation,
}

impl<'a> ClusterShader<'a> {
    pub fn new(config: ClusterConfig, lights: &'a LightBuffer, clusters: &'a ClusterBuffer) -> Self {
        Self {
            config,
            locator: ClusterLocator::new(&config),
            lights,
            clusters,
            specular: SpecularAccumulation::default(),
        }
    }

    pub fn with_specular(mut self, specular: SpecularAccumulation) -> Self {
        self.specular = specular;
        self
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Deferred: the surface comes out of the G-buffer pair.
    pub fn shade_deferred(&self, uniforms: &FrameUniforms, frag_coord: Vec2, texel: &GBufferTexel) -> Vec4 {
        let surface = texel.decode();
        self.accumulate(uniforms, frag_coord, &surface, None).extend(1.0)
    }

    /// Forward+: rasterizer attributes plus material maps, with specular.
    pub fn shade_forward(
        &self,
        uniforms: &FrameUniforms,
        frag_coord: Vec2,
        fragment: &ForwardFragment,
        maps: &MaterialMaps,
    ) -> Vec4 {
        let surface = maps.surface(fragment);
        self.accumulate(uniforms, frag_coord, &surface, Some(self.specular))
            .extend(1.0)
    }

    /// Outgoing radiance of `surface` from the lights of its cluster.
    pub fn accumulate(
        &self,
        uniforms: &FrameUniforms,
        frag_coord: Vec2,
        surface: &SurfaceSample,
        specular: Option<SpecularAccumulation>,
    ) -> Vec3 {
        let cluster = self
            .locator
            .cluster_index(uniforms, frag_coord, surface.position);

        let mut albedo = surface.albedo;
        let mut radiance = Vec3::ZERO;
        let mut highlights = Vec3::ZERO;

        // Count is read first; the loop is bounded by the total light count.
        for light_index in self.clusters.lights(cluster, self.config.num_lights) {
            let light = self.lights.decode(light_index);
            let to_light = light.position - surface.position;
            let distance = to_light.length();
            let l = to_light.normalize_or_zero();

            let intensity = cubic_gaussian(2.0 * distance / light.radius);
            let lambert = l.dot(surface.normal).max(0.0);

            if let Some(policy) = specular {
                let view_dir = (uniforms.camera_position - surface.position).normalize_or_zero();
                let half_dir = (l + view_dir).normalize_or_zero();
                let spec = half_dir.dot(surface.normal).max(0.0).powf(SPECULAR_EXPONENT);
                match policy {
                    SpecularAccumulation::IntoAlbedo => albedo += Vec3::splat(spec),
                    SpecularAccumulation::Separate => highlights += light.color * spec * intensity,
                }
            }

            radiance += albedo * lambert * light.color * intensity;
        }

        radiance + albedo * AMBIENT_LIGHT + highlights
    }
}
