use bytemuck::{Pod, Zeroable};
use lantern_core::LanternError;

use crate::TexelFormat;

/// One RGBA sample.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Texel(pub [f32; 4]);

impl Texel {
    /// Channel `index`, or 0.0 for a selector outside 0..4.
    #[inline]
    pub fn channel(&self, index: usize) -> f32 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn xyz(&self) -> glam::Vec3 {
        glam::Vec3::new(self.0[0], self.0[1], self.0[2])
    }

    #[inline]
    pub fn w(&self) -> f32 {
        self.0[3]
    }
}

/// Flat `(record, component)` to `(column, row, channel)` translation.
///
/// Records occupy columns; their scalar components run down the column four
/// to a texel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StridedAddress {
    pub column: u32,
    pub row: u32,
    pub channel: usize,
}

impl StridedAddress {
    #[inline]
    pub fn of(record: u32, component: u32) -> Self {
        Self {
            column: record,
            row: component / 4,
            channel: (component % 4) as usize,
        }
    }

    /// Normalized sample coordinates for this address in a `width x height`
    /// grid. The `+1` offsets keep samples off the clamped grid edge.
    /// Computed wide so a saturated `u32::MAX` record still lands on the
    /// clamped last column.
    #[inline]
    pub fn uv(&self, width: u32, height: u32) -> (f32, f32) {
        (offset_ratio(self.column, width), offset_ratio(self.row, height))
    }
}

/// A rectangular, row-major grid of texels standing in for a structured buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct TexelGrid {
    width: u32,
    height: u32,
    format: TexelFormat,
    texels: Vec<Texel>,
}

impl TexelGrid {
    /// A zero-filled grid.
    pub fn new(width: u32, height: u32, format: TexelFormat) -> Self {
        Self {
            width,
            height,
            format,
            texels: vec![Texel::default(); (width as usize) * (height as usize)],
        }
    }

    /// Wraps already-quantized texels, e.g. read back from a GPU.
    /// Returns `None` when the texel count does not match the dimensions.
    pub fn from_texels(width: u32, height: u32, format: TexelFormat, texels: Vec<Texel>) -> Option<Self> {
        ((width as usize) * (height as usize) == texels.len()).then_some(Self {
            width,
            height,
            format,
            texels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TexelFormat {
        self.format
    }

    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }

    /// Fails with [`LanternError::DimensionMismatch`] unless the grid is
    /// `expected_width x expected_height`.
    pub fn expect_size(
        &self,
        buffer: &'static str,
        expected_width: u32,
        expected_height: u32,
    ) -> Result<(), LanternError> {
        if self.width == expected_width && self.height == expected_height {
            return Ok(());
        }
        Err(LanternError::DimensionMismatch {
            buffer,
            expected_width,
            expected_height,
            found_width: self.width,
            found_height: self.height,
        })
    }

    /// Upload payload in the grid's format.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.format.encode_texels(&self.texels)
    }

    /// Read access point. Coordinates are clamped to the edge.
    pub fn texel(&self, column: u32, row: u32) -> Texel {
        if self.texels.is_empty() {
            return Texel::default();
        }
        let column = column.min(self.width - 1) as usize;
        let row = row.min(self.height - 1) as usize;
        self.texels[row * self.width as usize + column]
    }

    /// Write access point. Out-of-grid writes are dropped and reported.
    pub fn write_component(&mut self, address: StridedAddress, value: f32) -> bool {
        if address.column >= self.width || address.row >= self.height || address.channel > 3 {
            return false;
        }
        let i = address.row as usize * self.width as usize + address.column as usize;
        self.texels[i].0[address.channel] = self.format.quantize(value);
        true
    }

    /// Writes a whole texel. Returns false when out of the grid.
    pub fn write_texel(&mut self, column: u32, row: u32, value: [f32; 4]) -> bool {
        if column >= self.width || row >= self.height {
            return false;
        }
        let i = row as usize * self.width as usize + column as usize;
        self.texels[i] = Texel(value.map(|c| self.format.quantize(c)));
        true
    }

    /// Point sampling at normalized coordinates with clamp-to-edge addressing.
    pub fn sample(&self, u: f32, v: f32) -> Texel {
        let column = nearest(u, self.width);
        let row = nearest(v, self.height);
        self.texel(column, row)
    }

    /// Encode counterpart of [`scalar_at`], addressed with the grid's own dimensions.
    pub fn write_scalar(&mut self, record: u32, component: u32, value: f32) -> bool {
        self.write_component(StridedAddress::of(record, component), value)
    }

    /// [`scalar_at`] addressed with the grid's own dimensions.
    pub fn scalar(&self, record: u32, component: u32) -> f32 {
        scalar_at(self, self.width, self.height, record, component)
    }
}

/// `(index + 1) / (extent + 1)` without overflowing at `u32::MAX`.
#[inline]
pub(crate) fn offset_ratio(index: u32, extent: u32) -> f32 {
    ((index as f64 + 1.0) / (extent as f64 + 1.0)) as f32
}

/// Texel index hit by a normalized coordinate. NaN and negatives land on 0.
#[inline]
fn nearest(coord: f32, extent: u32) -> u32 {
    let scaled = (coord as f64 * extent as f64).floor();
    (scaled.max(0.0) as u32).min(extent.saturating_sub(1))
}

/// Reads one scalar component of one record.
///
/// `grid_width` and `grid_height` are the dimensions the caller was configured
/// with; if they disagree with the grid the sample lands on the wrong texel,
/// exactly as it would on the GPU.
pub fn scalar_at(grid: &TexelGrid, grid_width: u32, grid_height: u32, record: u32, component: u32) -> f32 {
    let address = StridedAddress::of(record, component);
    let (u, v) = address.uv(grid_width, grid_height);
    grid.sample(u, v).channel(address.channel)
}
