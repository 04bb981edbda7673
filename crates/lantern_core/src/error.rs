use thiserror::Error;

/// Setup-time failures. Nothing on the per-fragment path returns this; those
/// operations degrade to deterministic values instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LanternError {
    #[error("cluster grid dimension `{axis}` must be non-zero")]
    EmptyGrid { axis: &'static str },

    #[error("max_lights must be at least 1")]
    ZeroLightCapacity,

    #[error("num_lights must be at least 1")]
    NoLights,

    #[error("near clip ({near}) must be positive and smaller than far clip ({far})")]
    InvalidClipRange { near: f32, far: f32 },

    #[error("viewport must be non-empty, got {width}x{height}")]
    EmptyViewport { width: u32, height: u32 },

    #[error("{buffer} is {found_width}x{found_height}, configuration expects {expected_width}x{expected_height}")]
    DimensionMismatch {
        buffer: &'static str,
        expected_width: u32,
        expected_height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("configuration declares {expected} lights but {found} were supplied")]
    LightCountMismatch { expected: u32, found: usize },

    #[error("cluster assignment covers {found} clusters, grid has {expected}")]
    ClusterCountMismatch { expected: u32, found: usize },

    #[error("light {index} has a non-finite {field}")]
    NonFiniteLight { index: usize, field: &'static str },

    #[error("{format} cannot store {what} exactly")]
    FormatPrecision {
        format: &'static str,
        what: &'static str,
    },

    #[error("gbuffer is {found_width}x{found_height}, viewport is {width}x{height}")]
    GBufferSize {
        width: u32,
        height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("configuration declares {expected} gbuffer targets, {found} supplied")]
    GBufferCount { expected: u32, found: usize },

    #[error("pass was built for {expected} shading, got {found} surface input")]
    ModeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}
