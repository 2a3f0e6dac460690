/// Format translation between Prism formats and Vulkan formats
///
/// Pure functions only: no device access. Anything that depends on what the
/// physical device supports (depth fallback, blit filtering) is resolved by
/// the `DeviceContext`.

use ash::vk;
use prism_gpu::prism::render::{mip_extent, ResourceStorage, TextureFormat, COMPRESSED_BLOCK_EXTENT};

/// Native description of a logical texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VkFormatInfo {
    /// Vulkan format
    pub format: vk::Format,
    /// Block-compressed format (BC, ETC2, ASTC)
    pub is_compressed: bool,
    /// Bytes per 4x4 block (0 for uncompressed formats)
    pub bytes_per_block: u32,
    /// Depth and/or stencil format
    pub is_depth_or_stencil: bool,
}

/// Convert a TextureFormat to its Vulkan format
///
/// Returns `None` for formats with no Vulkan equivalent.
pub fn texture_format_to_vk(format: TextureFormat) -> Option<vk::Format> {
    let vk_format = match format {
        TextureFormat::Invalid => return None,
        TextureFormat::R8_UNORM => vk::Format::R8_UNORM,
        TextureFormat::R8G8_UNORM => vk::Format::R8G8_UNORM,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::A2B10G10R10_UNORM => vk::Format::A2B10G10R10_UNORM_PACK32,
        TextureFormat::R16_SFLOAT => vk::Format::R16_SFLOAT,
        TextureFormat::R16G16_SFLOAT => vk::Format::R16G16_SFLOAT,
        TextureFormat::R16G16B16A16_SFLOAT => vk::Format::R16G16B16A16_SFLOAT,
        TextureFormat::R32_UINT => vk::Format::R32_UINT,
        TextureFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        TextureFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        TextureFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        TextureFormat::BC1_RGBA_UNORM => vk::Format::BC1_RGBA_UNORM_BLOCK,
        TextureFormat::BC3_RGBA_UNORM => vk::Format::BC3_UNORM_BLOCK,
        TextureFormat::BC7_RGBA_UNORM => vk::Format::BC7_UNORM_BLOCK,
        TextureFormat::ETC2_RGB8_UNORM => vk::Format::ETC2_R8G8B8_UNORM_BLOCK,
        TextureFormat::ETC2_RGBA8_UNORM => vk::Format::ETC2_R8G8B8A8_UNORM_BLOCK,
        TextureFormat::ASTC_4x4_UNORM => vk::Format::ASTC_4X4_UNORM_BLOCK,
        TextureFormat::D16_UNORM => vk::Format::D16_UNORM,
        TextureFormat::D24_UNORM => vk::Format::X8_D24_UNORM_PACK32,
        TextureFormat::D32_FLOAT => vk::Format::D32_SFLOAT,
        TextureFormat::S8_UINT => vk::Format::S8_UINT,
        TextureFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
        TextureFormat::D32_FLOAT_S8_UINT => vk::Format::D32_SFLOAT_S8_UINT,
    };
    Some(vk_format)
}

/// Full native description of a logical format
pub fn format_info(format: TextureFormat) -> Option<VkFormatInfo> {
    let vk_format = texture_format_to_vk(format)?;
    Some(VkFormatInfo {
        format: vk_format,
        is_compressed: format.is_compressed(),
        bytes_per_block: format.bytes_per_block(),
        is_depth_or_stencil: format.is_depth_or_stencil(),
    })
}

/// Convert a Vulkan format back to a TextureFormat
///
/// Unknown formats map to `TextureFormat::Invalid`. Depth fallbacks chosen by
/// the device map to the logical format with the same depth layout.
pub fn vk_format_to_texture_format(format: vk::Format) -> TextureFormat {
    match format {
        vk::Format::R8_UNORM => TextureFormat::R8_UNORM,
        vk::Format::R8G8_UNORM => TextureFormat::R8G8_UNORM,
        vk::Format::R8G8B8A8_UNORM => TextureFormat::R8G8B8A8_UNORM,
        vk::Format::R8G8B8A8_SRGB => TextureFormat::R8G8B8A8_SRGB,
        vk::Format::B8G8R8A8_UNORM => TextureFormat::B8G8R8A8_UNORM,
        vk::Format::B8G8R8A8_SRGB => TextureFormat::B8G8R8A8_SRGB,
        vk::Format::A2B10G10R10_UNORM_PACK32 => TextureFormat::A2B10G10R10_UNORM,
        vk::Format::R16_SFLOAT => TextureFormat::R16_SFLOAT,
        vk::Format::R16G16_SFLOAT => TextureFormat::R16G16_SFLOAT,
        vk::Format::R16G16B16A16_SFLOAT => TextureFormat::R16G16B16A16_SFLOAT,
        vk::Format::R32_UINT => TextureFormat::R32_UINT,
        vk::Format::R32_SFLOAT => TextureFormat::R32_SFLOAT,
        vk::Format::R32G32_SFLOAT => TextureFormat::R32G32_SFLOAT,
        vk::Format::R32G32B32A32_SFLOAT => TextureFormat::R32G32B32A32_SFLOAT,
        vk::Format::BC1_RGBA_UNORM_BLOCK => TextureFormat::BC1_RGBA_UNORM,
        vk::Format::BC3_UNORM_BLOCK => TextureFormat::BC3_RGBA_UNORM,
        vk::Format::BC7_UNORM_BLOCK => TextureFormat::BC7_RGBA_UNORM,
        vk::Format::ETC2_R8G8B8_UNORM_BLOCK => TextureFormat::ETC2_RGB8_UNORM,
        vk::Format::ETC2_R8G8B8A8_UNORM_BLOCK => TextureFormat::ETC2_RGBA8_UNORM,
        vk::Format::ASTC_4X4_UNORM_BLOCK => TextureFormat::ASTC_4x4_UNORM,
        vk::Format::D16_UNORM => TextureFormat::D16_UNORM,
        vk::Format::X8_D24_UNORM_PACK32 => TextureFormat::D24_UNORM,
        vk::Format::D32_SFLOAT => TextureFormat::D32_FLOAT,
        vk::Format::S8_UINT => TextureFormat::S8_UINT,
        vk::Format::D24_UNORM_S8_UINT => TextureFormat::D24_UNORM_S8_UINT,
        vk::Format::D32_SFLOAT_S8_UINT => TextureFormat::D32_FLOAT_S8_UINT,
        _ => TextureFormat::Invalid,
    }
}

/// Native depth/stencil candidates for a logical format, best match first
///
/// The first entry is the exact translation. The device picks the first
/// candidate it supports as an optimal-tiling depth/stencil attachment.
/// Non depth/stencil formats have no candidates.
pub fn depth_stencil_candidates(format: TextureFormat) -> &'static [vk::Format] {
    match format {
        TextureFormat::D16_UNORM => &[
            vk::Format::D16_UNORM,
            vk::Format::D16_UNORM_S8_UINT,
            vk::Format::D24_UNORM_S8_UINT,
            vk::Format::D32_SFLOAT,
        ],
        TextureFormat::D24_UNORM => &[
            vk::Format::X8_D24_UNORM_PACK32,
            vk::Format::D24_UNORM_S8_UINT,
            vk::Format::D32_SFLOAT,
            vk::Format::D32_SFLOAT_S8_UINT,
        ],
        TextureFormat::D32_FLOAT => &[
            vk::Format::D32_SFLOAT,
            vk::Format::D32_SFLOAT_S8_UINT,
            vk::Format::D24_UNORM_S8_UINT,
        ],
        TextureFormat::S8_UINT => &[
            vk::Format::S8_UINT,
            vk::Format::D16_UNORM_S8_UINT,
            vk::Format::D24_UNORM_S8_UINT,
            vk::Format::D32_SFLOAT_S8_UINT,
        ],
        TextureFormat::D24_UNORM_S8_UINT => &[
            vk::Format::D24_UNORM_S8_UINT,
            vk::Format::D32_SFLOAT_S8_UINT,
        ],
        TextureFormat::D32_FLOAT_S8_UINT => &[
            vk::Format::D32_SFLOAT_S8_UINT,
            vk::Format::D24_UNORM_S8_UINT,
        ],
        _ => &[],
    }
}

/// Convert a sample count to Vulkan sample count flags
///
/// Returns `None` for counts that are not a power of two in 1..=64.
pub fn sample_count_to_vk(num_samples: u32) -> Option<vk::SampleCountFlags> {
    match num_samples {
        1 => Some(vk::SampleCountFlags::TYPE_1),
        2 => Some(vk::SampleCountFlags::TYPE_2),
        4 => Some(vk::SampleCountFlags::TYPE_4),
        8 => Some(vk::SampleCountFlags::TYPE_8),
        16 => Some(vk::SampleCountFlags::TYPE_16),
        32 => Some(vk::SampleCountFlags::TYPE_32),
        64 => Some(vk::SampleCountFlags::TYPE_64),
        _ => None,
    }
}

/// Image aspect used for views, copies and barriers of a format
///
/// Combined depth/stencil formats expose the depth aspect only.
pub fn aspect_for_format(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.has_depth() {
        vk::ImageAspectFlags::DEPTH
    } else if format.has_stencil() {
        vk::ImageAspectFlags::STENCIL
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

/// Buffer-side layout of texels copied to or from one image aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyTexelLayout {
    /// Width and height of one block in texels (1 when uncompressed)
    pub block_extent: u32,
    /// Bytes per block (per texel when uncompressed)
    pub bytes_per_block: u32,
}

impl CopyTexelLayout {
    const fn texel(bytes: u32) -> Self {
        Self {
            block_extent: 1,
            bytes_per_block: bytes,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.block_extent > 1
    }

    /// Tightly packed bytes of one row of blocks covering `width` texels
    pub fn bytes_per_row(&self, width: u32) -> usize {
        width.div_ceil(self.block_extent) as usize * self.bytes_per_block as usize
    }

    /// Tightly packed bytes of a `width` x `height` x `depth` region at `mip_level`
    ///
    /// The extents describe the region at its first level; each level halves them.
    pub fn bytes_per_slice(&self, width: u32, height: u32, depth: u32, mip_level: u32) -> usize {
        let rows = mip_extent(height, mip_level).div_ceil(self.block_extent);
        self.bytes_per_row(mip_extent(width, mip_level))
            * rows as usize
            * mip_extent(depth, mip_level) as usize
    }
}

/// Copy layout of `format` when only `aspect` is transferred
///
/// Depth and stencil are copied one aspect at a time with their own texel
/// sizes: D16 depth is 2 bytes, D24 and D32 depth are 4, stencil is 1.
/// Returns `None` when the format or the aspect cannot be copied.
pub fn copy_texel_layout(format: vk::Format, aspect: vk::ImageAspectFlags) -> Option<CopyTexelLayout> {
    if aspect.contains(vk::ImageAspectFlags::DEPTH) {
        return match format {
            vk::Format::D16_UNORM | vk::Format::D16_UNORM_S8_UINT => Some(CopyTexelLayout::texel(2)),
            vk::Format::X8_D24_UNORM_PACK32
            | vk::Format::D24_UNORM_S8_UINT
            | vk::Format::D32_SFLOAT
            | vk::Format::D32_SFLOAT_S8_UINT => Some(CopyTexelLayout::texel(4)),
            _ => None,
        };
    }
    if aspect.contains(vk::ImageAspectFlags::STENCIL) {
        return match format {
            vk::Format::S8_UINT
            | vk::Format::D16_UNORM_S8_UINT
            | vk::Format::D24_UNORM_S8_UINT
            | vk::Format::D32_SFLOAT_S8_UINT => Some(CopyTexelLayout::texel(1)),
            _ => None,
        };
    }

    let logical = vk_format_to_texture_format(format);
    if logical == TextureFormat::Invalid || logical.is_depth_or_stencil() {
        return None;
    }
    if logical.is_compressed() {
        Some(CopyTexelLayout {
            block_extent: COMPRESSED_BLOCK_EXTENT,
            bytes_per_block: logical.bytes_per_block(),
        })
    } else {
        Some(CopyTexelLayout::texel(logical.bytes_per_pixel()))
    }
}

/// Memory properties requested for a storage mode
pub fn storage_to_memory_flags(storage: ResourceStorage) -> vk::MemoryPropertyFlags {
    match storage {
        ResourceStorage::DevicePrivate => vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ResourceStorage::HostVisible => {
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
        }
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
