//! Cluster-scoped shading: per-fragment light accumulation over the lights
//! assigned to the fragment's cluster.

pub mod falloff;
pub mod pass;
pub mod shader;
pub mod surface;

pub use falloff::cubic_gaussian;
pub use pass::{Frame, FramePass, SurfaceSource};
pub use shader::{AMBIENT_LIGHT, ClusterShader, SPECULAR_EXPONENT, SpecularAccumulation};
pub use surface::{
    ForwardFragment, ForwardTarget, GBuffer, GBufferTexel, MaterialMaps, PackedNormal, SurfaceSample,
    apply_normal_map,
};
