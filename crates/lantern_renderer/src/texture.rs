use lantern_texel::{TexelFormat, TexelGrid};
use wgpu::{
    Device, Extent3d, Origin3d, Queue, TexelCopyBufferLayout, TexelCopyTextureInfo, Texture,
    TextureAspect, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages,
};

/// GPU format a texel grid is uploaded as.
pub fn texture_format(format: TexelFormat) -> TextureFormat {
    match format {
        TexelFormat::Rgba8Unorm => TextureFormat::Rgba8Unorm,
        TexelFormat::Rgba16Float => TextureFormat::Rgba16Float,
        TexelFormat::Rgba32Float => TextureFormat::Rgba32Float,
    }
}

/// A texel grid living in a sampled 2D texture.
pub struct GpuTexelTexture {
    pub texture: Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl GpuTexelTexture {
    pub fn upload(device: &Device, queue: &Queue, grid: &TexelGrid, label: &str) -> Self {
        let size = Extent3d {
            width: grid.width(),
            height: grid.height(),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: texture_format(grid.format()),
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            &grid.to_bytes(),
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(grid.width() * grid.format().bytes_per_texel() as u32),
                rows_per_image: Some(grid.height()),
            },
            size,
        );
        log::debug!(
            "Uploaded {label}: {}x{} {}",
            grid.width(),
            grid.height(),
            grid.format().label()
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width: grid.width(),
            height: grid.height(),
        }
    }
}

pub struct TextureHelper;

impl TextureHelper {
    pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
    pub const COLOR_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

    /// Offscreen color attachment the shading passes render into.
    pub fn create_color_target(device: &Device, width: u32, height: u32, label: &str) -> Texture {
        device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: Self::COLOR_FORMAT,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    /// Row pitch of a `COLOR_FORMAT` copy, padded to the buffer copy alignment.
    pub fn padded_bytes_per_row(width: u32) -> u32 {
        let unpadded = width * 4;
        unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
    }

    pub fn create_depth_texture(device: &Device, width: u32, height: u32, label: &str) -> wgpu::TextureView {
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readback_rows_are_padded_to_copy_alignment() {
        assert_eq!(TextureHelper::padded_bytes_per_row(1), 256);
        assert_eq!(TextureHelper::padded_bytes_per_row(64), 256);
        assert_eq!(TextureHelper::padded_bytes_per_row(65), 512);
        assert_eq!(TextureHelper::padded_bytes_per_row(24), 256);
    }

    #[test]
    fn texel_formats_map_to_matching_texture_formats() {
        for format in [
            TexelFormat::Rgba8Unorm,
            TexelFormat::Rgba16Float,
            TexelFormat::Rgba32Float,
        ] {
            let gpu = texture_format(format);
            assert_eq!(
                gpu.block_copy_size(None),
                Some(format.bytes_per_texel() as u32),
                "{}",
                format.label()
            );
        }
    }
}
