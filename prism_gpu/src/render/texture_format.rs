/// Texture formats and their API-agnostic size properties

/// Texture pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    /// Placeholder for "no format"; never representable on a backend
    Invalid,

    // Color formats
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    A2B10G10R10_UNORM,
    R16_SFLOAT,
    R16G16_SFLOAT,
    R16G16B16A16_SFLOAT,
    R32_UINT,
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32A32_SFLOAT,

    // Block-compressed formats (4x4 blocks)
    BC1_RGBA_UNORM,
    BC3_RGBA_UNORM,
    BC7_RGBA_UNORM,
    ETC2_RGB8_UNORM,
    ETC2_RGBA8_UNORM,
    ASTC_4x4_UNORM,

    // Depth/stencil formats
    D16_UNORM,
    D24_UNORM,
    D32_FLOAT,
    S8_UINT,
    D24_UNORM_S8_UINT,
    D32_FLOAT_S8_UINT,
}

/// Width and height (in pixels) of one compressed block
pub const COMPRESSED_BLOCK_EXTENT: u32 = 4;

impl TextureFormat {
    /// True for block-compressed formats (BCn, ETC2, ASTC)
    pub fn is_compressed(&self) -> bool {
        matches!(
            self,
            TextureFormat::BC1_RGBA_UNORM
                | TextureFormat::BC3_RGBA_UNORM
                | TextureFormat::BC7_RGBA_UNORM
                | TextureFormat::ETC2_RGB8_UNORM
                | TextureFormat::ETC2_RGBA8_UNORM
                | TextureFormat::ASTC_4x4_UNORM
        )
    }

    /// True for formats carrying a depth and/or stencil component
    pub fn is_depth_or_stencil(&self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM
                | TextureFormat::D24_UNORM
                | TextureFormat::D32_FLOAT
                | TextureFormat::S8_UINT
                | TextureFormat::D24_UNORM_S8_UINT
                | TextureFormat::D32_FLOAT_S8_UINT
        )
    }

    /// True for formats with a stencil component
    pub fn has_stencil(&self) -> bool {
        matches!(
            self,
            TextureFormat::S8_UINT
                | TextureFormat::D24_UNORM_S8_UINT
                | TextureFormat::D32_FLOAT_S8_UINT
        )
    }

    /// True for formats with a depth component
    pub fn has_depth(&self) -> bool {
        self.is_depth_or_stencil() && *self != TextureFormat::S8_UINT
    }

    /// Bytes per pixel for uncompressed formats, 0 for compressed and `Invalid`
    ///
    /// Combined depth/stencil formats report their depth aspect, the part an
    /// upload transfers.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Invalid => 0,
            TextureFormat::R8_UNORM | TextureFormat::S8_UINT => 1,
            TextureFormat::R8G8_UNORM
            | TextureFormat::R16_SFLOAT
            | TextureFormat::D16_UNORM => 2,
            TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::R8G8B8A8_SRGB
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::B8G8R8A8_SRGB
            | TextureFormat::A2B10G10R10_UNORM
            | TextureFormat::R16G16_SFLOAT
            | TextureFormat::R32_UINT
            | TextureFormat::R32_SFLOAT
            | TextureFormat::D24_UNORM
            | TextureFormat::D32_FLOAT
            | TextureFormat::D24_UNORM_S8_UINT
            | TextureFormat::D32_FLOAT_S8_UINT => 4,
            TextureFormat::R16G16B16A16_SFLOAT | TextureFormat::R32G32_SFLOAT => 8,
            TextureFormat::R32G32B32A32_SFLOAT => 16,
            TextureFormat::BC1_RGBA_UNORM
            | TextureFormat::BC3_RGBA_UNORM
            | TextureFormat::BC7_RGBA_UNORM
            | TextureFormat::ETC2_RGB8_UNORM
            | TextureFormat::ETC2_RGBA8_UNORM
            | TextureFormat::ASTC_4x4_UNORM => 0,
        }
    }

    /// Bytes per 4x4 block for compressed formats, 0 otherwise
    pub fn bytes_per_block(&self) -> u32 {
        match self {
            TextureFormat::BC1_RGBA_UNORM | TextureFormat::ETC2_RGB8_UNORM => 8,
            TextureFormat::BC3_RGBA_UNORM
            | TextureFormat::BC7_RGBA_UNORM
            | TextureFormat::ETC2_RGBA8_UNORM
            | TextureFormat::ASTC_4x4_UNORM => 16,
            _ => 0,
        }
    }

    /// Size in bytes of one tightly packed row of `width` pixels
    ///
    /// For compressed formats this is one row of blocks.
    pub fn bytes_per_row(&self, width: u32) -> usize {
        if self.is_compressed() {
            width.div_ceil(COMPRESSED_BLOCK_EXTENT) as usize * self.bytes_per_block() as usize
        } else {
            width as usize * self.bytes_per_pixel() as usize
        }
    }

    /// Size in bytes of one tightly packed slice of a region at `mip_level`
    ///
    /// `width`, `height` and `depth` describe the region at mip level 0; each
    /// dimension is halved per level and clamped to 1.
    pub fn bytes_per_slice(&self, width: u32, height: u32, depth: u32, mip_level: u32) -> usize {
        let w = mip_extent(width, mip_level);
        let h = mip_extent(height, mip_level);
        let d = mip_extent(depth, mip_level);

        let rows = if self.is_compressed() {
            h.div_ceil(COMPRESSED_BLOCK_EXTENT)
        } else {
            h
        };

        self.bytes_per_row(w) * rows as usize * d as usize
    }
}

/// Extent of a dimension at `mip_level`, never smaller than 1
pub fn mip_extent(extent: u32, mip_level: u32) -> u32 {
    extent.checked_shr(mip_level).unwrap_or(0).max(1)
}
