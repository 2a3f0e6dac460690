/// Texture trait, texture descriptor, and related value types

use bitflags::bitflags;
use crate::error::Result;
use crate::render::{TextureFormat, TextureRangeDesc};

/// Texture kind
///
/// Backends handle every variant exhaustively; a kind a backend cannot
/// represent is reported as `Error::Unimplemented` at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    /// Single 2D image (or a 2D array when `num_layers > 1`)
    TwoD,
    /// Explicit 2D array kind (reserved, not supported by the Vulkan backend yet)
    TwoDArray,
    /// Volumetric texture
    ThreeD,
    /// Cube map: 6 faces per layer
    Cube,
}

bitflags! {
    /// How a texture is going to be used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u8 {
        /// Texture can be sampled in shaders
        const SAMPLED = 1 << 0;
        /// Texture can be bound as a read/write storage image
        const STORAGE = 1 << 1;
        /// Texture can be used as a color or depth/stencil attachment
        const ATTACHMENT = 1 << 2;
    }
}

/// Where the texture memory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceStorage {
    /// Device-local memory, populated through staged copies
    #[default]
    DevicePrivate,
    /// Host-visible, coherent memory
    HostVisible,
}

/// Cube map face, in native layer order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureCubeFace {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

impl TextureCubeFace {
    /// All faces in native layer order (+X, -X, +Y, -Y, +Z, -Z)
    pub const ALL: [TextureCubeFace; 6] = [
        TextureCubeFace::PosX,
        TextureCubeFace::NegX,
        TextureCubeFace::PosY,
        TextureCubeFace::NegY,
        TextureCubeFace::PosZ,
        TextureCubeFace::NegZ,
    ];

    /// Layer offset of this face inside one cube
    pub fn layer_offset(self) -> u32 {
        self as u32
    }
}

/// Number of native layers per cube
pub const CUBE_FACE_COUNT: u32 = 6;

/// Texture extents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

// ===== TEXTURE DESC =====

/// Descriptor for creating a texture
///
/// Immutable once a texture has been created from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    /// Texture kind
    pub texture_type: TextureType,
    /// Pixel format
    pub format: TextureFormat,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Depth in pixels (1 for TwoD and Cube)
    pub depth: u32,
    /// Number of array layers (number of cubes for Cube textures)
    pub num_layers: u32,
    /// Samples per pixel (1 = no multisampling)
    pub num_samples: u32,
    /// Number of mip levels (1 = no mip chain)
    pub num_mip_levels: u32,
    /// Usage flags
    pub usage: TextureUsage,
    /// Memory placement
    pub storage: ResourceStorage,
    /// Optional debug name attached to native objects
    pub debug_name: String,
}

impl TextureDesc {
    /// Descriptor for a 2D texture with one layer, one sample and one mip level
    pub fn new_2d(format: TextureFormat, width: u32, height: u32, usage: TextureUsage) -> Self {
        Self {
            texture_type: TextureType::TwoD,
            format,
            width,
            height,
            depth: 1,
            num_layers: 1,
            num_samples: 1,
            num_mip_levels: 1,
            usage,
            storage: ResourceStorage::DevicePrivate,
            debug_name: String::new(),
        }
    }

    /// Descriptor for a 3D texture
    pub fn new_3d(
        format: TextureFormat,
        width: u32,
        height: u32,
        depth: u32,
        usage: TextureUsage,
    ) -> Self {
        Self {
            texture_type: TextureType::ThreeD,
            depth,
            ..Self::new_2d(format, width, height, usage)
        }
    }

    /// Descriptor for a cube texture (one cube, six faces)
    pub fn new_cube(format: TextureFormat, width: u32, height: u32, usage: TextureUsage) -> Self {
        Self {
            texture_type: TextureType::Cube,
            ..Self::new_2d(format, width, height, usage)
        }
    }

    /// Builder-style mip level count
    pub fn with_mip_levels(mut self, num_mip_levels: u32) -> Self {
        self.num_mip_levels = num_mip_levels;
        self
    }

    /// Builder-style layer count
    pub fn with_layers(mut self, num_layers: u32) -> Self {
        self.num_layers = num_layers;
        self
    }

    /// Builder-style sample count
    pub fn with_samples(mut self, num_samples: u32) -> Self {
        self.num_samples = num_samples;
        self
    }

    /// Builder-style storage
    pub fn with_storage(mut self, storage: ResourceStorage) -> Self {
        self.storage = storage;
        self
    }

    /// Builder-style debug name
    pub fn with_debug_name(mut self, name: impl Into<String>) -> Self {
        self.debug_name = name.into();
        self
    }

    /// Maximum mip chain length for a `width` x `height` texture:
    /// `floor(log2(max(width, height))) + 1`
    pub fn calc_num_mip_levels(width: u32, height: u32) -> u32 {
        let largest = width.max(height).max(1);
        u32::BITS - largest.leading_zeros()
    }

    /// Number of layers the native image is created with
    /// (`num_layers * 6` for cube textures, saturating at `u32::MAX`)
    pub fn native_layer_count(&self) -> u32 {
        match self.texture_type {
            TextureType::Cube => self.num_layers.saturating_mul(CUBE_FACE_COUNT),
            TextureType::TwoD | TextureType::TwoDArray | TextureType::ThreeD => self.num_layers,
        }
    }

    /// Extents of the texture
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }
}

// ===== TEXTURE TRAIT =====

/// Texture resource trait
///
/// Implemented by backend-specific texture types (e.g., the Vulkan `Texture`).
/// The texture is destroyed when the last owner drops it.
pub trait Texture: Send + Sync {
    /// Descriptor the texture was created from
    fn desc(&self) -> &TextureDesc;

    /// Stable identifier usable in shader-visible descriptor tables
    fn texture_id(&self) -> u32;

    /// True when the texture wraps an image owned by the presentation engine
    fn is_swapchain_texture(&self) -> bool;

    /// Upload pixel data into `range`
    ///
    /// `data == None` is a successful no-op. `bytes_per_row == 0` means the
    /// rows are tightly packed.
    fn upload(
        &self,
        range: &TextureRangeDesc,
        data: Option<&[u8]>,
        bytes_per_row: usize,
    ) -> Result<()>;

    /// Upload pixel data into a single face of a cube texture
    fn upload_cube_face(
        &self,
        range: &TextureRangeDesc,
        face: TextureCubeFace,
        data: Option<&[u8]>,
        bytes_per_row: usize,
    ) -> Result<()>;

    /// Fill mip levels 1.. from level 0. Blocks until the GPU work completes.
    fn generate_mipmap(&self) -> Result<()>;

    /// Extents of the texture
    fn dimensions(&self) -> Dimensions {
        self.desc().dimensions()
    }

    /// Pixel format
    fn format(&self) -> TextureFormat {
        self.desc().format
    }

    /// Texture kind
    fn texture_type(&self) -> TextureType {
        self.desc().texture_type
    }

    /// Usage flags
    fn usage(&self) -> TextureUsage {
        self.desc().usage
    }

    /// Samples per pixel
    fn samples(&self) -> u32 {
        self.desc().num_samples
    }

    /// Number of mip levels
    fn num_mip_levels(&self) -> u32 {
        self.desc().num_mip_levels
    }

    /// Number of layers as declared (cubes count once)
    fn num_layers(&self) -> u32 {
        self.desc().num_layers
    }

    /// Range covering mip level 0 of the whole texture
    fn full_range(&self) -> TextureRangeDesc {
        let desc = self.desc();
        TextureRangeDesc::new_3d(0, 0, 0, desc.width, desc.height, desc.depth)
    }
}

/// View typed pixels (e.g. `[u8; 4]`, `[f32; 4]`) as upload bytes
pub fn texel_bytes<T: bytemuck::Pod>(texels: &[T]) -> &[u8] {
    bytemuck::cast_slice(texels)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
