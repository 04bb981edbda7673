use lantern_core::{ClusterConfig, LanternError};

use crate::{TexelFormat, TexelGrid, scalar_at};

/// Component holding the light count; indices follow from component 1.
const COUNT_COMPONENT: u32 = 0;

/// Per-cluster light lists as produced by a culling pass, before encoding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterAssignment {
    lists: Vec<Vec<u32>>,
}

impl ClusterAssignment {
    pub fn new(cluster_count: u32) -> Self {
        Self {
            lists: vec![Vec::new(); cluster_count as usize],
        }
    }

    /// Appends `light` to `cluster`'s list. Returns false for an unknown cluster.
    pub fn push(&mut self, cluster: u32, light: u32) -> bool {
        match self.lists.get_mut(cluster as usize) {
            Some(list) => {
                list.push(light);
                true
            }
            None => false,
        }
    }

    pub fn lights(&self, cluster: u32) -> &[u32] {
        self.lists
            .get(cluster as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn cluster_count(&self) -> usize {
        self.lists.len()
    }
}

/// The per-cluster light-index lists, one column per cluster:
/// component 0 is `count`, components `1..=count` are light indices.
#[derive(Clone, Debug)]
pub struct ClusterBuffer {
    grid: TexelGrid,
    width: u32,
    height: u32,
}

impl ClusterBuffer {
    /// Encodes `assignment`. Lists longer than `max_lights` are truncated; the
    /// shading pass trusts `count <= max_lights` and never checks it.
    pub fn encode(
        config: &ClusterConfig,
        format: TexelFormat,
        assignment: &ClusterAssignment,
    ) -> Result<Self, LanternError> {
        if assignment.cluster_count() != config.cluster_count() as usize {
            return Err(LanternError::ClusterCountMismatch {
                expected: config.cluster_count(),
                found: assignment.cluster_count(),
            });
        }
        let largest_value = config.max_lights.max(config.num_lights.saturating_sub(1));
        if largest_value > format.max_exact_integer() {
            return Err(LanternError::FormatPrecision {
                format: format.label(),
                what: "light indices",
            });
        }

        let width = config.cluster_texture_width();
        let height = config.cluster_texture_height();
        let mut grid = TexelGrid::new(width, height, format);
        let mut dropped = 0usize;

        for (cluster, lights) in assignment.lists.iter().enumerate() {
            let cluster = cluster as u32;
            let kept = lights.len().min(config.max_lights as usize);
            dropped += lights.len() - kept;

            grid.write_scalar(cluster, COUNT_COMPONENT, kept as f32);
            for (slot, &light) in lights[..kept].iter().enumerate() {
                grid.write_scalar(cluster, slot as u32 + 1, light as f32);
            }
        }

        if dropped > 0 {
            log::warn!(
                "dropped {dropped} light references exceeding max_lights = {}",
                config.max_lights
            );
        }
        Ok(Self {
            grid,
            width,
            height,
        })
    }

    /// Adopts a grid produced elsewhere after checking it against `config`.
    pub fn from_grid(config: &ClusterConfig, grid: TexelGrid) -> Result<Self, LanternError> {
        let width = config.cluster_texture_width();
        let height = config.cluster_texture_height();
        grid.expect_size("cluster buffer", width, height)?;
        Ok(Self {
            grid,
            width,
            height,
        })
    }

    /// Number of lights affecting `cluster`.
    pub fn light_count(&self, cluster: u32) -> u32 {
        decode_integer(scalar_at(
            &self.grid,
            self.width,
            self.height,
            cluster,
            COUNT_COMPONENT,
        ))
    }

    /// The `slot`-th light index of `cluster`.
    pub fn light_index(&self, cluster: u32, slot: u32) -> u32 {
        decode_integer(scalar_at(
            &self.grid,
            self.width,
            self.height,
            cluster,
            slot + 1,
        ))
    }

    /// Light indices of `cluster`: reads the count first, then walks a loop of
    /// at most `loop_bound` iterations that stops once the count is reached.
    pub fn lights(&self, cluster: u32, loop_bound: u32) -> impl Iterator<Item = u32> + '_ {
        let count = self.light_count(cluster);
        (0..loop_bound)
            .take_while(move |&slot| slot < count)
            .map(move |slot| self.light_index(cluster, slot))
    }

    pub fn grid(&self) -> &TexelGrid {
        &self.grid
    }
}

/// Sampled floats back to indices: nearest integer, negatives and NaN to 0.
#[inline]
fn decode_integer(value: f32) -> u32 {
    value.round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClusterConfig {
        ClusterConfig {
            num_gbuffers: 2,
            num_lights: 10,
            x_slices: 2,
            y_slices: 2,
            z_slices: 2,
            max_lights: 5,
        }
    }

    #[test]
    fn round_trips_counts_and_indices() {
        let config = config();
        let mut assignment = ClusterAssignment::new(config.cluster_count());
        for light in [3, 9, 0] {
            assignment.push(7, light);
        }
        assignment.push(2, 4);

        let buffer = ClusterBuffer::encode(&config, TexelFormat::Rgba16Float, &assignment).unwrap();
        assert_eq!(buffer.light_count(7), 3);
        assert_eq!(buffer.lights(7, config.num_lights).collect::<Vec<_>>(), vec![3, 9, 0]);
        assert_eq!(buffer.lights(2, config.num_lights).collect::<Vec<_>>(), vec![4]);
        assert_eq!(buffer.light_count(0), 0);
    }

    #[test]
    fn empty_cluster_ignores_stale_rows() {
        let config = config();
        let assignment = ClusterAssignment::new(config.cluster_count());
        let mut buffer = ClusterBuffer::encode(&config, TexelFormat::Rgba32Float, &assignment).unwrap();
        // Garbage beyond the count must never be visited.
        for slot in 1..8 {
            buffer.grid.write_scalar(1, slot, 6.0);
        }
        assert_eq!(buffer.lights(1, config.num_lights).count(), 0);
    }

    #[test]
    fn overflowing_lists_are_truncated() {
        let config = config();
        let mut assignment = ClusterAssignment::new(config.cluster_count());
        for light in 0..8 {
            assignment.push(0, light);
        }
        let buffer = ClusterBuffer::encode(&config, TexelFormat::Rgba32Float, &assignment).unwrap();
        assert_eq!(buffer.light_count(0), config.max_lights);
        assert_eq!(buffer.lights(0, config.num_lights).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn loop_bound_caps_iteration() {
        let config = config();
        let mut assignment = ClusterAssignment::new(config.cluster_count());
        for light in 0..4 {
            assignment.push(3, light);
        }
        let buffer = ClusterBuffer::encode(&config, TexelFormat::Rgba32Float, &assignment).unwrap();
        assert_eq!(buffer.lights(3, 2).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn grid_dimensions_follow_configuration() {
        let config = config();
        let buffer = ClusterBuffer::encode(
            &config,
            TexelFormat::Rgba32Float,
            &ClusterAssignment::new(config.cluster_count()),
        )
        .unwrap();
        assert_eq!(buffer.grid().width(), 8);
        // ceil(6 / 4) + 1
        assert_eq!(buffer.grid().height(), 3);
    }

    #[test]
    fn rejects_wrong_cluster_count() {
        let err = ClusterBuffer::encode(&config(), TexelFormat::Rgba32Float, &ClusterAssignment::new(3))
            .unwrap_err();
        assert_eq!(err, LanternError::ClusterCountMismatch { expected: 8, found: 3 });
    }

    #[test]
    fn rejects_format_that_cannot_hold_indices() {
        let config = config();
        let err = ClusterBuffer::encode(
            &config,
            TexelFormat::Rgba8Unorm,
            &ClusterAssignment::new(config.cluster_count()),
        )
        .unwrap_err();
        assert!(matches!(err, LanternError::FormatPrecision { .. }));
    }

    #[test]
    fn push_to_unknown_cluster_is_refused() {
        let mut assignment = ClusterAssignment::new(2);
        assert!(!assignment.push(2, 0));
        assert!(assignment.lights(2).is_empty());
    }

    #[test]
    fn decode_integer_saturates() {
        assert_eq!(decode_integer(-3.0), 0);
        assert_eq!(decode_integer(f32::NAN), 0);
        assert_eq!(decode_integer(4.9999), 5);
    }
}
