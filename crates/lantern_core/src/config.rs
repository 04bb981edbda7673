use serde::{Deserialize, Serialize};

use crate::LanternError;

/// The light buffer always spans two rows: `(position, radius)` then `(color, _)`.
pub const LIGHT_TEXTURE_HEIGHT: u32 = 2;

/// Numeric options a shading program is specialized for.
///
/// These size every loop bound and grid dimension. The passes that produce the
/// light and cluster buffers must be built from the same values, otherwise
/// decoding silently misaligns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub num_gbuffers: u32,
    pub num_lights: u32,
    pub x_slices: u32,
    pub y_slices: u32,
    pub z_slices: u32,
    pub max_lights: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            num_gbuffers: 2,
            num_lights: 100,
            x_slices: 15,
            y_slices: 15,
            z_slices: 15,
            max_lights: 100,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<(), LanternError> {
        for (axis, value) in [
            ("x_slices", self.x_slices),
            ("y_slices", self.y_slices),
            ("z_slices", self.z_slices),
        ] {
            if value == 0 {
                return Err(LanternError::EmptyGrid { axis });
            }
        }
        if self.num_gbuffers < 2 {
            return Err(LanternError::GBufferCount {
                expected: 2,
                found: self.num_gbuffers as usize,
            });
        }
        if self.max_lights == 0 {
            return Err(LanternError::ZeroLightCapacity);
        }
        if self.num_lights == 0 {
            return Err(LanternError::NoLights);
        }
        Ok(())
    }

    pub fn cluster_count(&self) -> u32 {
        self.x_slices * self.y_slices * self.z_slices
    }

    pub fn light_texture_width(&self) -> u32 {
        self.num_lights
    }

    /// One column per cluster.
    pub fn cluster_texture_width(&self) -> u32 {
        self.cluster_count()
    }

    /// Rows needed for `count` plus `max_lights` indices packed four per texel, plus one.
    pub fn cluster_texture_height(&self) -> u32 {
        (self.max_lights + 1).div_ceil(4) + 1
    }
}

/// Where a fragment's surface attributes come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadingMode {
    /// Position, normal and albedo decoded from a G-buffer pair.
    #[default]
    Deferred,
    /// Interpolated attributes plus albedo and normal maps, with a specular term.
    ForwardPlus,
}

impl ShadingMode {
    pub fn label(&self) -> &'static str {
        match self {
            ShadingMode::Deferred => "deferred",
            ShadingMode::ForwardPlus => "forward_plus",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_texture_height_rounds_up() {
        let config = ClusterConfig {
            max_lights: 100,
            ..Default::default()
        };
        // 101 components -> 26 rows, plus one.
        assert_eq!(config.cluster_texture_height(), 27);

        let config = ClusterConfig {
            max_lights: 3,
            ..Default::default()
        };
        assert_eq!(config.cluster_texture_height(), 2);
    }

    #[test]
    fn cluster_count_is_product_of_slices() {
        let config = ClusterConfig {
            x_slices: 2,
            y_slices: 3,
            z_slices: 4,
            ..Default::default()
        };
        assert_eq!(config.cluster_count(), 24);
        assert_eq!(config.cluster_texture_width(), 24);
    }

    #[test]
    fn validate_rejects_empty_axis() {
        let config = ClusterConfig {
            y_slices: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(LanternError::EmptyGrid { axis: "y_slices" })
        );
        assert!(ClusterConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_requires_position_and_albedo_targets() {
        let config = ClusterConfig {
            num_gbuffers: 1,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(LanternError::GBufferCount {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn shading_mode_reads_from_snake_case() {
        let mode: ShadingMode = serde_json::from_str("\"forward_plus\"").unwrap();
        assert_eq!(mode, ShadingMode::ForwardPlus);
    }
}
