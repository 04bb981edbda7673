use std::path::Path;

use glam::Vec3;
use lantern_core::{Camera, ClusterConfig, Transform};
use lantern_shading::SpecularAccumulation;
use lantern_texel::{LightRecord, TexelFormat};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraRig {
    pub eye: Vec3,
    pub target: Vec3,
    #[serde(flatten)]
    pub lens: Camera,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 6.0, 14.0),
            target: Vec3::new(0.0, 0.0, -2.0),
            lens: Camera::default(),
        }
    }
}

impl CameraRig {
    pub fn transform(&self) -> Transform {
        Transform::from_xyz(self.eye.x, self.eye.y, self.eye.z).looking_at(self.target, Vec3::Y)
    }
}

/// Horizontal checkered plane at `height`, `extent` units from the origin on
/// each side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Floor {
    pub height: f32,
    pub extent: f32,
    /// World units per material repeat.
    pub tile: f32,
    pub albedo: Vec3,
    pub alternate_albedo: Vec3,
}

impl Default for Floor {
    fn default() -> Self {
        Self {
            height: 0.0,
            extent: 20.0,
            tile: 2.0,
            albedo: Vec3::splat(0.8),
            alternate_albedo: Vec3::splat(0.55),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub width: u32,
    pub height: u32,
    /// Worker threads for fragment evaluation; 0 lets rayon decide.
    pub threads: usize,
    pub format: TexelFormat,
    pub clusters: ClusterConfig,
    pub specular: SpecularAccumulation,
    pub camera: CameraRig,
    pub floor: Floor,
    /// Empty means a generated ring of colored lights.
    pub lights: Vec<LightRecord>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            threads: 0,
            format: TexelFormat::Rgba32Float,
            clusters: ClusterConfig::default(),
            specular: SpecularAccumulation::default(),
            camera: CameraRig::default(),
            floor: Floor::default(),
            lights: Vec::new(),
        }
    }
}

impl SceneConfig {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let contents = std::fs::read_to_string(path).map_err(|source| AppError::ReadScene {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| AppError::ParseScene {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The scene's lights, generating the default ring when none are listed.
    pub fn resolved_lights(&self) -> Vec<LightRecord> {
        if self.lights.is_empty() {
            light_ring(24, 8.0, self.floor.height + 0.6)
        } else {
            self.lights.clone()
        }
    }

    /// Cluster configuration with the light count taken from the scene.
    pub fn resolved_clusters(&self, light_count: usize) -> ClusterConfig {
        let mut clusters = self.clusters;
        if clusters.num_lights as usize != light_count {
            log::info!(
                "Scene has {light_count} lights, overriding configured count {}",
                clusters.num_lights
            );
            clusters.num_lights = light_count as u32;
        }
        clusters
    }
}

/// `count` lights on two concentric rings, hues spread around the color wheel.
pub fn light_ring(count: u32, radius: f32, height: f32) -> Vec<LightRecord> {
    (0..count)
        .map(|i| {
            let t = i as f32 / count as f32;
            let angle = t * std::f32::consts::TAU;
            let ring = if i % 2 == 0 { radius } else { radius * 0.5 };
            let position = Vec3::new(angle.cos() * ring, height, angle.sin() * ring);
            LightRecord::new(position, 4.0, hue(t))
        })
        .collect()
}

fn hue(t: f32) -> Vec3 {
    let channel = |offset: f32| {
        let x = ((t + offset).fract() * 6.0 - 3.0).abs() - 1.0;
        x.clamp(0.0, 1.0)
    };
    Vec3::new(channel(0.0), channel(2.0 / 3.0), channel(1.0 / 3.0))
}
