use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use lantern_core::Transform;
use lantern_renderer::programs::ForwardVertex;
use lantern_shading::{ForwardFragment, ForwardTarget, GBuffer, MaterialMaps, SurfaceSample};
use lantern_texel::{TexelFormat, TexelGrid};
use rayon::prelude::*;

use crate::scene::{Floor, SceneConfig};

const NORMAL_MAP_SIZE: u32 = 32;
const BUMP_WAVES: f32 = 4.0;
const BUMP_TILT: f32 = 0.35;

/// First intersection of a pixel's primary ray with the floor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloorHit {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub albedo: Vec3,
}

impl Floor {
    /// World size of one albedo/normal map repeat: two checker tiles.
    pub fn period(&self) -> f32 {
        self.tile * 2.0
    }

    pub fn uv_at(&self, position: Vec3) -> Vec2 {
        let period = self.period();
        Vec2::new(
            (position.x / period).rem_euclid(1.0),
            (position.z / period).rem_euclid(1.0),
        )
    }

    pub fn albedo_at(&self, position: Vec3) -> Vec3 {
        let cell = (position.x / self.tile).floor() as i64 + (position.z / self.tile).floor() as i64;
        if cell.rem_euclid(2) == 0 {
            self.albedo
        } else {
            self.alternate_albedo
        }
    }

    /// Casts the primary ray through pixel (`column`, `row`), row 0 at the top.
    pub fn trace(&self, scene: &SceneConfig, eye: &Transform, column: u32, row: u32) -> Option<FloorHit> {
        let lens = &scene.camera.lens;
        let aspect = scene.width as f32 / scene.height as f32;
        let tan_half = (lens.fov * 0.5).tan();
        let ndc = Vec2::new(
            (column as f32 + 0.5) / scene.width as f32 * 2.0 - 1.0,
            1.0 - (row as f32 + 0.5) / scene.height as f32 * 2.0,
        );
        // View space, depth 1 along -Z: the ray parameter is the view depth.
        let direction = eye.rotation * Vec3::new(ndc.x * tan_half * aspect, ndc.y * tan_half, -1.0);
        let origin = eye.translation;

        if direction.y.abs() < f32::EPSILON {
            return None;
        }
        let t = (self.height - origin.y) / direction.y;
        if !(lens.near..=lens.far).contains(&t) {
            return None;
        }
        let position = origin + direction * t;
        if position.x.abs() > self.extent || position.z.abs() > self.extent {
            return None;
        }

        let normal = if origin.y >= self.height { Vec3::Y } else { Vec3::NEG_Y };
        Some(FloorHit {
            position,
            normal,
            uv: self.uv_at(position),
            albedo: self.albedo_at(position),
        })
    }
}

/// Rasterizes the floor into a G-buffer pair and a forward fragment target.
pub fn rasterize(scene: &SceneConfig, eye: &Transform) -> (GBuffer, ForwardTarget) {
    let (width, height) = (scene.width, scene.height);
    let hits: Vec<(u32, u32, FloorHit)> = (0..height)
        .into_par_iter()
        .flat_map_iter(|row| {
            (0..width).filter_map(move |column| {
                scene
                    .floor
                    .trace(scene, eye, column, row)
                    .map(|hit| (column, row, hit))
            })
        })
        .collect();
    log::debug!("Floor covers {} of {} pixels", hits.len(), width * height);

    let mut gbuffer = GBuffer::new(width, height, scene.format);
    let mut fragments = ForwardTarget::new(width, height);
    for (column, row, hit) in hits {
        gbuffer.write(
            column,
            row,
            &SurfaceSample {
                position: hit.position,
                normal: hit.normal,
                albedo: hit.albedo,
            },
        );
        fragments.set(
            column,
            row,
            ForwardFragment {
                position: hit.position,
                normal: hit.normal,
                uv: hit.uv,
            },
        );
    }
    (gbuffer, fragments)
}

/// A 2x2 checker albedo map and a rippled normal map, both 8-bit.
pub fn material_maps(floor: &Floor) -> MaterialMaps {
    let format = TexelFormat::Rgba8Unorm;

    let mut albedo = TexelGrid::new(2, 2, format);
    for (column, row) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        let color = if (column + row) % 2 == 0 {
            floor.albedo
        } else {
            floor.alternate_albedo
        };
        albedo.write_texel(column, row, color.extend(1.0).to_array());
    }

    let mut normal = TexelGrid::new(NORMAL_MAP_SIZE, NORMAL_MAP_SIZE, format);
    for row in 0..NORMAL_MAP_SIZE {
        for column in 0..NORMAL_MAP_SIZE {
            let u = (column as f32 + 0.5) / NORMAL_MAP_SIZE as f32;
            let v = (row as f32 + 0.5) / NORMAL_MAP_SIZE as f32;
            let tangent_space = Vec3::new(
                BUMP_TILT * (u * BUMP_WAVES * TAU).sin(),
                BUMP_TILT * (v * BUMP_WAVES * TAU).sin(),
                1.0,
            )
            .normalize();
            let encoded = tangent_space * 0.5 + Vec3::splat(0.5);
            normal.write_texel(column, row, encoded.extend(1.0).to_array());
        }
    }

    MaterialMaps { albedo, normal }
}

/// Floor triangles for the GPU forward pass, one quad per map repeat so the
/// clamped sampler sees `[0, 1]` coordinates.
pub fn floor_mesh(floor: &Floor) -> Vec<ForwardVertex> {
    let period = floor.period();
    let cells = (floor.extent * 2.0 / period).ceil().max(1.0) as u32;
    let normal = [0.0, 1.0, 0.0];
    let y = floor.height;

    let mut vertices = Vec::with_capacity((cells * cells * 6) as usize);
    for i in 0..cells {
        for j in 0..cells {
            let x0 = -floor.extent + i as f32 * period;
            let z0 = -floor.extent + j as f32 * period;
            let (x1, z1) = (x0 + period, z0 + period);
            let vertex = |x: f32, z: f32, u: f32, v: f32| ForwardVertex {
                position: [x, y, z],
                normal,
                uv: [u, v],
            };
            // Counter-clockwise seen from above.
            vertices.extend([
                vertex(x0, z0, 0.0, 0.0),
                vertex(x0, z1, 0.0, 1.0),
                vertex(x1, z1, 1.0, 1.0),
                vertex(x0, z0, 0.0, 0.0),
                vertex(x1, z1, 1.0, 1.0),
                vertex(x1, z0, 1.0, 0.0),
            ]);
        }
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scene() -> SceneConfig {
        SceneConfig {
            width: 16,
            height: 9,
            ..Default::default()
        }
    }

    #[test]
    fn center_ray_hits_the_look_target() {
        let mut scene = scene();
        scene.width = 15;
        scene.height = 15;
        let eye = scene.camera.transform();
        let hit = scene.floor.trace(&scene, &eye, 7, 7).unwrap();
        assert_relative_eq!(hit.position, scene.camera.target, epsilon = 1e-3);
        assert_eq!(hit.normal, Vec3::Y);
    }

    #[test]
    fn rays_above_the_horizon_miss() {
        let scene = scene();
        let eye = Transform::from_xyz(0.0, 2.0, 0.0).looking_at(Vec3::new(0.0, 3.0, -5.0), Vec3::Y);
        assert!(scene.floor.trace(&scene, &eye, 8, 0).is_none());
    }

    #[test]
    fn checker_alternates_per_tile() {
        let floor = Floor::default();
        let a = floor.albedo_at(Vec3::new(0.5, 0.0, 0.5));
        let b = floor.albedo_at(Vec3::new(floor.tile + 0.5, 0.0, 0.5));
        let c = floor.albedo_at(Vec3::new(-0.5, 0.0, 0.5));
        assert_eq!(a, floor.albedo);
        assert_eq!(b, floor.alternate_albedo);
        assert_eq!(c, floor.alternate_albedo);
    }

    #[test]
    fn albedo_map_agrees_with_the_analytic_checker() {
        let floor = Floor::default();
        let maps = material_maps(&floor);
        for position in [
            Vec3::new(0.5, 0.0, 0.5),
            Vec3::new(2.5, 0.0, 0.5),
            Vec3::new(-0.5, 0.0, 3.5),
            Vec3::new(-3.1, 0.0, -2.9),
        ] {
            let sampled = maps.albedo_at(floor.uv_at(position));
            assert_relative_eq!(sampled, floor.albedo_at(position), epsilon = 1.0 / 255.0);
        }
    }

    #[test]
    fn rasterized_targets_agree() {
        let scene = scene();
        let eye = scene.camera.transform();
        let (gbuffer, fragments) = rasterize(&scene, &eye);
        let fragment = fragments.get(8, 8).copied().unwrap();
        let uv = Vec2::new(8.5 / 16.0, 8.5 / 9.0);
        let surface = gbuffer.sample(uv).decode();
        assert_relative_eq!(surface.position, fragment.position, epsilon = 1e-4);
        assert_relative_eq!(surface.normal, fragment.normal, epsilon = 1e-6);
    }

    #[test]
    fn mesh_is_whole_quads_facing_up() {
        let floor = Floor::default();
        let mesh = floor_mesh(&floor);
        assert_eq!(mesh.len() % 6, 0);
        for triangle in mesh.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| Vec3::from_array(triangle[i].position));
            assert!((b - a).cross(c - a).y > 0.0);
        }
    }
}
