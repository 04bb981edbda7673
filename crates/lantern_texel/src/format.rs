use serde::{Deserialize, Serialize};

use crate::Texel;

/// Channel storage of a texel grid. Writes are quantized to this precision so
/// a CPU-side grid reads back exactly what the GPU copy of it would.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TexelFormat {
    Rgba8Unorm,  // 0-255 per channel, albedo and normal maps
    Rgba16Float, // half floats, exact integers up to 2048
    #[default]
    Rgba32Float,
}

impl TexelFormat {
    pub fn label(&self) -> &'static str {
        match self {
            TexelFormat::Rgba8Unorm => "rgba8unorm",
            TexelFormat::Rgba16Float => "rgba16float",
            TexelFormat::Rgba32Float => "rgba32float",
        }
    }

    pub fn bytes_per_texel(&self) -> usize {
        match self {
            TexelFormat::Rgba8Unorm => 4,
            TexelFormat::Rgba16Float => 8,
            TexelFormat::Rgba32Float => 16,
        }
    }

    /// Whether the format holds signed values outside [0, 1].
    pub fn is_float(&self) -> bool {
        !matches!(self, TexelFormat::Rgba8Unorm)
    }

    /// Largest integer every smaller non-negative integer of which round-trips exactly.
    pub fn max_exact_integer(&self) -> u32 {
        match self {
            TexelFormat::Rgba8Unorm => 1,
            TexelFormat::Rgba16Float => 1 << 11,
            TexelFormat::Rgba32Float => 1 << 24,
        }
    }

    /// Rounds `value` to what one channel of this format stores.
    pub fn quantize(&self, value: f32) -> f32 {
        match self {
            TexelFormat::Rgba8Unorm => (value.clamp(0.0, 1.0) * 255.0).round() / 255.0,
            TexelFormat::Rgba16Float => half::f16::from_f32(value).to_f32(),
            TexelFormat::Rgba32Float => value,
        }
    }

    /// Packs texels row-major into the byte layout of the format.
    pub fn encode_texels(&self, texels: &[Texel]) -> Vec<u8> {
        match self {
            TexelFormat::Rgba8Unorm => texels
                .iter()
                .flat_map(|t| t.0.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
                .collect(),
            TexelFormat::Rgba16Float => {
                let bits: Vec<u16> = texels
                    .iter()
                    .flat_map(|t| t.0.map(|c| half::f16::from_f32(c).to_bits()))
                    .collect();
                bytemuck::cast_slice(&bits).to_vec()
            }
            TexelFormat::Rgba32Float => bytemuck::cast_slice(texels).to_vec(),
        }
    }
}
