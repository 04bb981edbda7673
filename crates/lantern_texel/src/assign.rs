use lantern_core::ClusterConfig;

use crate::{ClusterAssignment, LightRecord};

/// Produces per-cluster light lists for a frame.
///
/// This is the seam to the culling pass that tests each light's sphere of
/// influence against each cluster's sub-volume. Implementations may return
/// lists longer than `max_lights`; encoding truncates them.
pub trait LightAssigner {
    fn assign(&self, config: &ClusterConfig, lights: &[LightRecord]) -> ClusterAssignment;
}

/// Every light in every cluster. Correct for any scene, as long as the light
/// count fits in `max_lights`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExhaustiveAssigner;

impl LightAssigner for ExhaustiveAssigner {
    fn assign(&self, config: &ClusterConfig, lights: &[LightRecord]) -> ClusterAssignment {
        let mut assignment = ClusterAssignment::new(config.cluster_count());
        for cluster in 0..config.cluster_count() {
            for light in 0..lights.len() as u32 {
                assignment.push(cluster, light);
            }
        }
        assignment
    }
}
