pub use rayon;

pub mod camera;
pub mod config;
pub mod error;
pub mod transform;

pub use camera::{Camera, FrameUniforms};
pub use config::{ClusterConfig, LIGHT_TEXTURE_HEIGHT, ShadingMode};
pub use error::LanternError;
pub use transform::Transform;

/// Configures the global rayon pool that fragment evaluation runs on.
///
/// Rayon initializes itself the first time it is used, so calling this is
/// optional. A second call is ignored (the global pool can only be built once).
pub fn init_compute_pool(num_threads: usize) {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("lantern-shade-{i}"))
        .build_global()
    {
        Ok(()) => log::info!("compute pool started with {num_threads} threads"),
        Err(e) => log::debug!("compute pool already initialized: {e}"),
    }
}
