/// Upload ranges: sub-regions of a texture targeted by a single upload

use crate::error::{Error, Result};
use crate::render::{mip_extent, TextureDesc, TextureType};

/// Sub-region of a texture
///
/// `x`, `y`, `z`, `width`, `height` and `depth` are expressed in pixels of
/// `mip_level`. For `upload()` on cube textures, `layer` addresses native
/// layers (cube index * 6 + face); for `upload_cube_face()` it addresses the
/// cube index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureRangeDesc {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub layer: u32,
    pub num_layers: u32,
    pub mip_level: u32,
    pub num_mip_levels: u32,
}

impl TextureRangeDesc {
    /// 2D region on layer 0, mip level 0
    pub fn new_2d(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::new_3d(x, y, 0, width, height, 1)
    }

    /// 3D region on layer 0, mip level 0
    pub fn new_3d(x: u32, y: u32, z: u32, width: u32, height: u32, depth: u32) -> Self {
        Self {
            x,
            y,
            z,
            width,
            height,
            depth,
            layer: 0,
            num_layers: 1,
            mip_level: 0,
            num_mip_levels: 1,
        }
    }

    /// Same region targeting `mip_level` and the following `num_mip_levels - 1` levels
    pub fn with_mip_levels(mut self, mip_level: u32, num_mip_levels: u32) -> Self {
        self.mip_level = mip_level;
        self.num_mip_levels = num_mip_levels;
        self
    }

    /// Same region targeting layers `layer..layer + num_layers`
    pub fn with_layers(mut self, layer: u32, num_layers: u32) -> Self {
        self.layer = layer;
        self.num_layers = num_layers;
        self
    }

    /// Validate this range against a texture, addressing native layers
    pub fn validate(&self, desc: &TextureDesc) -> Result<()> {
        self.validate_with_layer_count(desc, desc.native_layer_count())
    }

    /// Validate this range for a single cube face upload (`layer` is a cube index)
    pub fn validate_cube_face(&self, desc: &TextureDesc) -> Result<()> {
        if desc.texture_type != TextureType::Cube {
            return Err(Error::InvalidOperation(
                "Cube face upload requires a Cube texture".to_string(),
            ));
        }
        if self.num_layers != 1 {
            return Err(Error::ArgumentOutOfRange(format!(
                "Cube face upload targets exactly one layer, got {}",
                self.num_layers
            )));
        }
        self.validate_with_layer_count(desc, desc.num_layers)
    }

    fn validate_with_layer_count(&self, desc: &TextureDesc, layer_count: u32) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(Error::ArgumentOutOfRange(format!(
                "Upload range has an empty extent ({}x{}x{})",
                self.width, self.height, self.depth
            )));
        }
        if self.num_layers == 0 || self.num_mip_levels == 0 {
            return Err(Error::ArgumentOutOfRange(
                "Upload range must cover at least one layer and one mip level".to_string(),
            ));
        }

        let mip_end = self.mip_level as u64 + self.num_mip_levels as u64;
        if mip_end > desc.num_mip_levels as u64 {
            return Err(Error::ArgumentOutOfRange(format!(
                "Mip levels {}..{} exceed the texture's {} mip levels",
                self.mip_level, mip_end, desc.num_mip_levels
            )));
        }

        let layer_end = self.layer as u64 + self.num_layers as u64;
        if layer_end > layer_count as u64 {
            return Err(Error::ArgumentOutOfRange(format!(
                "Layers {}..{} exceed the texture's {} layers",
                self.layer, layer_end, layer_count
            )));
        }

        let level_width = mip_extent(desc.width, self.mip_level);
        let level_height = mip_extent(desc.height, self.mip_level);
        let level_depth = mip_extent(desc.depth, self.mip_level);

        let fits = |offset: u32, extent: u32, limit: u32| offset as u64 + extent as u64 <= limit as u64;
        if !fits(self.x, self.width, level_width)
            || !fits(self.y, self.height, level_height)
            || !fits(self.z, self.depth, level_depth)
        {
            return Err(Error::ArgumentOutOfRange(format!(
                "Region ({}, {}, {}) + {}x{}x{} exceeds mip level {} extent {}x{}x{}",
                self.x,
                self.y,
                self.z,
                self.width,
                self.height,
                self.depth,
                self.mip_level,
                level_width,
                level_height,
                level_depth
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "texture_range_tests.rs"]
mod tests;
