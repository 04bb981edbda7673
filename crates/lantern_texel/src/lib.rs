//! Structured buffers carried over 2D RGBA texel grids.
//!
//! The only transport the shading pass can read is a point-sampled 4-channel
//! image, so variable-length records (the light list and the per-cluster
//! light-index lists) are flattened into grids: one column per record, four
//! scalar components per row.

pub mod assign;
pub mod cluster_buffer;
pub mod format;
pub mod grid;
pub mod light_buffer;

pub use assign::{ExhaustiveAssigner, LightAssigner};
pub use cluster_buffer::{ClusterAssignment, ClusterBuffer};
pub use format::TexelFormat;
pub use grid::{StridedAddress, Texel, TexelGrid, scalar_at};
pub use light_buffer::{LightBuffer, LightRecord};
