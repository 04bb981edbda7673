use glam::Vec3;
use lantern_core::{ClusterConfig, LIGHT_TEXTURE_HEIGHT, LanternError};
use serde::{Deserialize, Serialize};

use crate::{TexelFormat, TexelGrid, grid::offset_ratio, scalar_at};

/// Rows of the two fixed bands the light decode samples at.
const POSITION_BAND_V: f32 = 0.3;
const COLOR_BAND_V: f32 = 0.6;

/// Scalar component holding the radius: alpha of the position row.
const RADIUS_COMPONENT: u32 = 3;

/// A point light. The row it occupies in the light buffer is its identifier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightRecord {
    /// World or view space, whichever the shaded positions use.
    pub position: Vec3,
    /// Distance at which the light's influence reaches zero.
    pub radius: f32,
    pub color: Vec3,
}

impl LightRecord {
    pub fn new(position: Vec3, radius: f32, color: Vec3) -> Self {
        Self {
            position,
            radius,
            color,
        }
    }
}

/// The global light list, one column per light:
///
/// ```text
/// row 0: position.x position.y position.z radius
/// row 1: color.r    color.g    color.b    (unused)
/// ```
#[derive(Clone, Debug)]
pub struct LightBuffer {
    grid: TexelGrid,
    num_lights: u32,
}

impl LightBuffer {
    /// Lays `lights` out into a fresh grid. The slice length must equal
    /// `config.num_lights`; the shading program is specialized on it.
    pub fn encode(
        config: &ClusterConfig,
        format: TexelFormat,
        lights: &[LightRecord],
    ) -> Result<Self, LanternError> {
        if lights.len() != config.num_lights as usize {
            return Err(LanternError::LightCountMismatch {
                expected: config.num_lights,
                found: lights.len(),
            });
        }
        if !format.is_float() {
            return Err(LanternError::FormatPrecision {
                format: format.label(),
                what: "light positions",
            });
        }

        let mut grid = TexelGrid::new(config.light_texture_width(), LIGHT_TEXTURE_HEIGHT, format);
        for (index, light) in lights.iter().enumerate() {
            if !light.position.is_finite() {
                return Err(LanternError::NonFiniteLight { index, field: "position" });
            }
            if !light.radius.is_finite() {
                return Err(LanternError::NonFiniteLight { index, field: "radius" });
            }
            if !light.color.is_finite() {
                return Err(LanternError::NonFiniteLight { index, field: "color" });
            }
            let column = index as u32;
            grid.write_texel(column, 0, light.position.extend(light.radius).to_array());
            grid.write_texel(column, 1, light.color.extend(0.0).to_array());
        }

        log::debug!(
            "encoded {} lights into {}x{} {} grid",
            lights.len(),
            grid.width(),
            grid.height(),
            format.label()
        );
        Ok(Self {
            grid,
            num_lights: config.num_lights,
        })
    }

    /// Adopts a grid produced elsewhere after checking it against `config`.
    pub fn from_grid(config: &ClusterConfig, grid: TexelGrid) -> Result<Self, LanternError> {
        grid.expect_size("light buffer", config.light_texture_width(), LIGHT_TEXTURE_HEIGHT)?;
        Ok(Self {
            grid,
            num_lights: config.num_lights,
        })
    }

    /// Reads light `index`. Indices past the end clamp to the last light.
    pub fn decode(&self, index: u32) -> LightRecord {
        let u = offset_ratio(index, self.num_lights);
        let position = self.grid.sample(u, POSITION_BAND_V).xyz();
        let color = self.grid.sample(u, COLOR_BAND_V).xyz();
        let radius = scalar_at(
            &self.grid,
            self.num_lights,
            LIGHT_TEXTURE_HEIGHT,
            index,
            RADIUS_COMPONENT,
        );
        LightRecord {
            position,
            radius,
            color,
        }
    }

    pub fn len(&self) -> u32 {
        self.num_lights
    }

    pub fn is_empty(&self) -> bool {
        self.num_lights == 0
    }

    pub fn grid(&self) -> &TexelGrid {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(num_lights: u32) -> ClusterConfig {
        ClusterConfig {
            num_lights,
            ..Default::default()
        }
    }

    fn sample_lights(n: u32) -> Vec<LightRecord> {
        (0..n)
            .map(|i| {
                let f = i as f32;
                LightRecord::new(
                    Vec3::new(f * 1.5 - 4.0, 0.5 + f, -f * 2.25),
                    2.0 + f,
                    Vec3::new(0.1 * f, 1.0, 0.75),
                )
            })
            .collect()
    }

    #[test]
    fn decodes_what_was_encoded() {
        let lights = sample_lights(7);
        let buffer = LightBuffer::encode(&config(7), TexelFormat::Rgba32Float, &lights).unwrap();
        for (i, light) in lights.iter().enumerate() {
            assert_eq!(buffer.decode(i as u32), *light);
        }
    }

    #[test]
    fn half_float_round_trip_is_within_quantization() {
        let lights = sample_lights(5);
        let buffer = LightBuffer::encode(&config(5), TexelFormat::Rgba16Float, &lights).unwrap();
        for (i, light) in lights.iter().enumerate() {
            let decoded = buffer.decode(i as u32);
            assert_relative_eq!(decoded.position, light.position, max_relative = 1e-3);
            assert_relative_eq!(decoded.radius, light.radius, max_relative = 1e-3);
            assert_relative_eq!(decoded.color, light.color, max_relative = 1e-3);
        }
    }

    #[test]
    fn radius_lives_in_position_alpha() {
        let lights = sample_lights(3);
        let buffer = LightBuffer::encode(&config(3), TexelFormat::Rgba32Float, &lights).unwrap();
        assert_eq!(buffer.grid().texel(2, 0).w(), lights[2].radius);
        assert_eq!(buffer.grid().texel(2, 1).w(), 0.0);
    }

    #[test]
    fn saturated_index_decodes_last_light() {
        let lights = sample_lights(4);
        let buffer = LightBuffer::encode(&config(4), TexelFormat::Rgba32Float, &lights).unwrap();
        assert_eq!(buffer.decode(u32::MAX), lights[3]);
    }

    #[test]
    fn rejects_wrong_light_count() {
        let err = LightBuffer::encode(&config(4), TexelFormat::Rgba32Float, &sample_lights(3))
            .unwrap_err();
        assert_eq!(err, LanternError::LightCountMismatch { expected: 4, found: 3 });
    }

    #[test]
    fn rejects_unorm_storage() {
        let err = LightBuffer::encode(&config(1), TexelFormat::Rgba8Unorm, &sample_lights(1))
            .unwrap_err();
        assert!(matches!(err, LanternError::FormatPrecision { .. }));
    }

    #[test]
    fn rejects_non_finite_radius() {
        let mut lights = sample_lights(2);
        lights[1].radius = f32::INFINITY;
        let err = LightBuffer::encode(&config(2), TexelFormat::Rgba32Float, &lights).unwrap_err();
        assert_eq!(err, LanternError::NonFiniteLight { index: 1, field: "radius" });
    }

    #[test]
    fn from_grid_checks_dimensions() {
        let grid = TexelGrid::new(5, 3, TexelFormat::Rgba32Float);
        let err = LightBuffer::from_grid(&config(5), grid).unwrap_err();
        assert!(matches!(
            err,
            LanternError::DimensionMismatch { expected_height: 2, found_height: 3, .. }
        ));
    }
}
