use glam::{Vec2, Vec3};
use lantern_core::LanternError;
use lantern_texel::{Texel, TexelFormat, TexelGrid};

/// Arbitrary, slightly off-axis up vector for building a tangent basis, so the
/// cross product never degenerates for vertical normals.
const TANGENT_UP: Vec3 = Vec3::new(0.001, 1.0, 0.001);

/// Surface attributes of one fragment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSample {
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
}

/// A unit normal sent as two components plus the sign of the third.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PackedNormal {
    pub x: f32,
    pub y: f32,
    pub negative_z: bool,
}

impl PackedNormal {
    pub fn pack(normal: Vec3) -> Self {
        Self {
            x: normal.x,
            y: normal.y,
            negative_z: normal.z.is_sign_negative(),
        }
    }

    /// Rebuilds `z` from `x² + y² + z² = 1`. Inputs slightly off the unit disc
    /// (texel quantization) give `z = 0` rather than NaN.
    pub fn unpack(&self) -> Vec3 {
        let z = (1.0 - self.x * self.x - self.y * self.y).max(0.0).sqrt();
        Vec3::new(self.x, self.y, if self.negative_z { -z } else { z })
    }
}

/// One pixel of the deferred G-buffer pair.
///
/// ```text
/// target 0: position.x position.y position.z normal.x
/// target 1: ±albedo.r  albedo.g   albedo.b   normal.y
/// ```
///
/// The sign of normal.z rides on the sign bit of albedo red, which is why red
/// is stored negated for back-facing-z normals. A zero red keeps the flag as
/// -0.0, so only float targets can carry it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GBufferTexel {
    pub position: Texel,
    pub albedo: Texel,
}

impl GBufferTexel {
    pub fn encode(surface: &SurfaceSample) -> Self {
        let normal = PackedNormal::pack(surface.normal);
        let red = surface.albedo.x.abs();
        let red = if normal.negative_z { -red } else { red };
        Self {
            position: Texel(surface.position.extend(normal.x).to_array()),
            albedo: Texel([red, surface.albedo.y, surface.albedo.z, normal.y]),
        }
    }

    /// Splits the tagged red channel into albedo and normal sign, as one unit.
    pub fn packed_normal(&self) -> (PackedNormal, f32) {
        let red = self.albedo.0[0];
        let normal = PackedNormal {
            x: self.position.w(),
            y: self.albedo.w(),
            negative_z: red.is_sign_negative(),
        };
        (normal, red.abs())
    }

    pub fn decode(&self) -> SurfaceSample {
        let (normal, red) = self.packed_normal();
        SurfaceSample {
            position: self.position.xyz(),
            normal: normal.unpack(),
            albedo: Vec3::new(red, self.albedo.0[1], self.albedo.0[2]),
        }
    }
}

/// Full-screen G-buffer targets. Row 0 is the top of the image.
#[derive(Clone, Debug)]
pub struct GBuffer {
    targets: Vec<TexelGrid>,
    width: u32,
    height: u32,
}

impl GBuffer {
    /// A cleared position/albedo pair.
    pub fn new(width: u32, height: u32, format: TexelFormat) -> Self {
        Self {
            targets: vec![TexelGrid::new(width, height, format); 2],
            width,
            height,
        }
    }

    /// Adopts targets rendered elsewhere; the first two are the position and
    /// albedo planes, and all must share one size.
    pub fn from_targets(targets: Vec<TexelGrid>) -> Result<Self, LanternError> {
        if targets.len() < 2 {
            return Err(LanternError::GBufferCount {
                expected: 2,
                found: targets.len(),
            });
        }
        let (width, height) = (targets[0].width(), targets[0].height());
        if let Some(odd) = targets.iter().find(|t| t.width() != width || t.height() != height) {
            return Err(LanternError::GBufferSize {
                width,
                height,
                found_width: odd.width(),
                found_height: odd.height(),
            });
        }
        Ok(Self {
            targets,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn targets(&self) -> &[TexelGrid] {
        &self.targets
    }

    pub fn write(&mut self, column: u32, row: u32, surface: &SurfaceSample) {
        let texel = GBufferTexel::encode(surface);
        self.targets[0].write_texel(column, row, texel.position.0);
        self.targets[1].write_texel(column, row, texel.albedo.0);
    }

    /// Point-samples both targets at screen `uv`.
    pub fn sample(&self, uv: Vec2) -> GBufferTexel {
        GBufferTexel {
            position: self.targets[0].sample(uv.x, uv.y),
            albedo: self.targets[1].sample(uv.x, uv.y),
        }
    }
}

/// Interpolated attributes of a forward-rasterized fragment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForwardFragment {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

/// Rasterizer output: the front-most fragment per pixel, row 0 at the top.
#[derive(Clone, Debug)]
pub struct ForwardTarget {
    width: u32,
    height: u32,
    fragments: Vec<Option<ForwardFragment>>,
}

impl ForwardTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fragments: vec![None; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set(&mut self, column: u32, row: u32, fragment: ForwardFragment) {
        if column < self.width && row < self.height {
            self.fragments[(row * self.width + column) as usize] = Some(fragment);
        }
    }

    pub fn get(&self, column: u32, row: u32) -> Option<&ForwardFragment> {
        if column >= self.width || row >= self.height {
            return None;
        }
        self.fragments[(row * self.width + column) as usize].as_ref()
    }
}

/// Albedo and tangent-space normal maps of a forward-shaded material.
#[derive(Clone, Debug)]
pub struct MaterialMaps {
    pub albedo: TexelGrid,
    pub normal: TexelGrid,
}

impl MaterialMaps {
    /// A 1x1 material: constant albedo, unperturbed normals.
    pub fn flat(albedo: Vec3, format: TexelFormat) -> Self {
        let mut albedo_map = TexelGrid::new(1, 1, format);
        albedo_map.write_texel(0, 0, albedo.extend(1.0).to_array());
        let mut normal_map = TexelGrid::new(1, 1, format);
        normal_map.write_texel(0, 0, [0.5, 0.5, 1.0, 1.0]);
        Self {
            albedo: albedo_map,
            normal: normal_map,
        }
    }

    pub fn albedo_at(&self, uv: Vec2) -> Vec3 {
        self.albedo.sample(uv.x, uv.y).xyz()
    }

    pub fn normal_at(&self, uv: Vec2) -> Vec3 {
        self.normal.sample(uv.x, uv.y).xyz()
    }

    /// Surface of `fragment`: sampled albedo and normal-mapped normal.
    pub fn surface(&self, fragment: &ForwardFragment) -> SurfaceSample {
        SurfaceSample {
            position: fragment.position,
            normal: apply_normal_map(fragment.normal, self.normal_at(fragment.uv)),
            albedo: self.albedo_at(fragment.uv),
        }
    }
}

/// Perturbs `geometric` by a `[0, 1]`-encoded tangent-space normal, in a
/// tangent basis built around a fixed up vector.
pub fn apply_normal_map(geometric: Vec3, encoded: Vec3) -> Vec3 {
    let normap = encoded * 2.0 - Vec3::ONE;
    let up = TANGENT_UP.normalize();
    let tangent = geometric.cross(up).normalize();
    let bitangent = geometric.cross(tangent);
    normap.y * tangent + normap.x * bitangent + normap.z * geometric
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn surface(normal: Vec3, albedo: Vec3) -> SurfaceSample {
        SurfaceSample {
            position: Vec3::new(1.0, -2.0, 3.5),
            normal,
            albedo,
        }
    }

    #[test]
    fn reconstructed_normal_is_unit_length() {
        for (x, y) in [(0.0, 0.0), (0.6, 0.0), (0.3, -0.4), (-0.70710677, 0.70710677)] {
            for negative_z in [false, true] {
                let n = PackedNormal { x, y, negative_z }.unpack();
                assert_relative_eq!(n.length_squared(), 1.0, epsilon = 1e-5);
                assert_eq!(n.z.is_sign_negative(), negative_z);
            }
        }
    }

    #[test]
    fn off_disc_components_do_not_produce_nan() {
        let n = PackedNormal {
            x: 0.8,
            y: 0.6000001,
            negative_z: false,
        }
        .unpack();
        assert_eq!(n.z, 0.0);
    }

    #[test]
    fn negative_z_is_carried_by_albedo_red() {
        let s = surface(Vec3::new(0.0, 0.6, -0.8), Vec3::new(0.7, 0.2, 0.1));
        let texel = GBufferTexel::encode(&s);
        assert_eq!(texel.albedo.0[0], -0.7);

        let decoded = texel.decode();
        assert_eq!(decoded.albedo, s.albedo);
        assert_relative_eq!(decoded.normal, s.normal, epsilon = 1e-6);
        assert_eq!(decoded.position, s.position);
    }

    #[test]
    fn sign_survives_black_red_channel() {
        let s = surface(Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.5, 0.5));
        let decoded = GBufferTexel::encode(&s).decode();
        assert_eq!(decoded.normal, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(decoded.albedo.x, 0.0);
    }

    #[test]
    fn gbuffer_samples_pixel_centers() {
        let mut gbuffer = GBuffer::new(4, 2, TexelFormat::Rgba32Float);
        let s = surface(Vec3::Z, Vec3::ONE);
        gbuffer.write(3, 1, &s);
        let uv = Vec2::new(3.5 / 4.0, 1.5 / 2.0);
        assert_eq!(gbuffer.sample(uv).decode(), s);
        assert_eq!(gbuffer.sample(Vec2::new(0.1, 0.1)), GBufferTexel::default());
    }

    #[test]
    fn gbuffer_needs_position_and_albedo_targets() {
        let err =
            GBuffer::from_targets(vec![TexelGrid::new(4, 4, TexelFormat::Rgba32Float)]).unwrap_err();
        assert_eq!(
            err,
            LanternError::GBufferCount {
                expected: 2,
                found: 1
            }
        );
        assert!(GBuffer::from_targets(Vec::new()).is_err());
    }

    #[test]
    fn gbuffer_targets_must_match_in_size() {
        let err = GBuffer::from_targets(vec![
            TexelGrid::new(4, 4, TexelFormat::Rgba32Float),
            TexelGrid::new(4, 3, TexelFormat::Rgba32Float),
        ])
        .unwrap_err();
        assert!(matches!(err, LanternError::GBufferSize { found_height: 3, .. }));
    }

    #[test]
    fn flat_normal_map_keeps_geometric_normal() {
        let n = apply_normal_map(Vec3::Z, Vec3::new(0.5, 0.5, 1.0));
        assert_relative_eq!(n, Vec3::Z, epsilon = 1e-6);
    }

    #[test]
    fn forward_surface_keeps_interpolated_normal_length() {
        let maps = MaterialMaps::flat(Vec3::ONE, TexelFormat::Rgba32Float);
        let fragment = ForwardFragment {
            position: Vec3::ZERO,
            normal: Vec3::new(0.0, 0.0, 0.5),
            uv: Vec2::splat(0.5),
        };
        let surface = maps.surface(&fragment);
        assert_relative_eq!(surface.normal, Vec3::new(0.0, 0.0, 0.5), epsilon = 1e-6);
    }

    #[test]
    fn vertical_normal_has_a_valid_basis() {
        let n = apply_normal_map(Vec3::Y, Vec3::new(1.0, 0.5, 0.5));
        assert!(n.is_finite());
        assert_abs_diff_eq!(n.dot(Vec3::Y), 0.0, epsilon = 1e-5);
        assert_relative_eq!(n.length(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn forward_target_ignores_out_of_range_writes() {
        let mut target = ForwardTarget::new(2, 2);
        let fragment = ForwardFragment {
            position: Vec3::ZERO,
            normal: Vec3::Y,
            uv: Vec2::ZERO,
        };
        target.set(5, 0, fragment);
        target.set(1, 1, fragment);
        assert!(target.get(5, 0).is_none());
        assert_eq!(target.get(1, 1), Some(&fragment));
    }
}
