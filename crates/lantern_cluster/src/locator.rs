use glam::{Vec2, Vec3};
use lantern_core::{ClusterConfig, FrameUniforms};

/// Integer cell coordinates. Signed: fragments outside the frustum produce
/// coordinates outside the grid, which are not clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClusterCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ClusterCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ClusterLocator {
    x_slices: u32,
    y_slices: u32,
    z_slices: u32,
}

impl ClusterLocator {
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            x_slices: config.x_slices,
            y_slices: config.y_slices,
            z_slices: config.z_slices,
        }
    }

    /// Cell containing a fragment at window coordinate `frag_coord` (pixels,
    /// origin bottom-left) whose surface point is `position`.
    pub fn locate(&self, uniforms: &FrameUniforms, frag_coord: Vec2, position: Vec3) -> ClusterCoord {
        let view_z = uniforms.view.transform_point3(position).z;
        ClusterCoord {
            x: slice(frag_coord.x / uniforms.width, self.x_slices),
            y: slice(frag_coord.y / uniforms.height, self.y_slices),
            z: slice(
                (-view_z - uniforms.near) / (uniforms.far - uniforms.near),
                self.z_slices,
            ),
        }
    }

    /// `x + y * xSlices + z * xSlices * ySlices`. Negative results saturate
    /// to 0 and oversized ones to `u32::MAX`; both then read clamped texels.
    pub fn linear_index(&self, coord: ClusterCoord) -> u32 {
        let x_slices = self.x_slices as i64;
        let y_slices = self.y_slices as i64;
        let index = coord.x as i64 + coord.y as i64 * x_slices + coord.z as i64 * x_slices * y_slices;
        index.clamp(0, u32::MAX as i64) as u32
    }

    /// Inverse of [`linear_index`](Self::linear_index) for in-grid indices.
    pub fn coord_of(&self, index: u32) -> ClusterCoord {
        let plane = self.x_slices * self.y_slices;
        ClusterCoord {
            x: (index % self.x_slices) as i32,
            y: (index % plane / self.x_slices) as i32,
            z: (index / plane) as i32,
        }
    }

    pub fn contains(&self, coord: ClusterCoord) -> bool {
        (0..self.x_slices as i32).contains(&coord.x)
            && (0..self.y_slices as i32).contains(&coord.y)
            && (0..self.z_slices as i32).contains(&coord.z)
    }

    /// Linear cluster index of a fragment, see [`locate`](Self::locate).
    pub fn cluster_index(&self, uniforms: &FrameUniforms, frag_coord: Vec2, position: Vec3) -> u32 {
        self.linear_index(self.locate(uniforms, frag_coord, position))
    }
}

/// `floor(t * slices)` as a signed cell coordinate.
#[inline]
fn slice(t: f32, slices: u32) -> i32 {
    (t * slices as f32).floor() as i32
}
