/*!
# Prism GPU - Vulkan Backend

Vulkan implementation of the Prism GPU image resource subsystem.

This crate implements the `prism_gpu` texture trait on top of the Ash
Vulkan bindings, with gpu-allocator for memory management.

## Architecture

- **DeviceContext**: The device collaborator seam (image allocation, views,
  staging copies, transient command buffers, texture ids)
- **VulkanContext**: Headless `DeviceContext` implementation owning the
  instance, device, allocator and upload command pool
- **VulkanImage / VulkanImageView**: Native image + memory + views
- **Texture**: Validates descriptors, derives native parameters, uploads
  pixel data and generates mip chains
*/

// Vulkan implementation modules
mod debug;
mod vulkan_context;
mod vulkan_device;
mod vulkan_format;
mod vulkan_image;
mod vulkan_image_view;
mod vulkan_staging;
mod vulkan_texture;

// Mock device context for unit tests (no GPU required)
#[cfg(test)]
mod mock_context;

pub use vulkan_context::{DeviceContext, ImageBarrier, ImageCreateDesc, ImageViewDesc, NativeImage};
pub use vulkan_device::VulkanContext;
pub use vulkan_format::{
    aspect_for_format, copy_texel_layout, depth_stencil_candidates, format_info, sample_count_to_vk,
    storage_to_memory_flags, texture_format_to_vk, vk_format_to_texture_format, CopyTexelLayout,
    VkFormatInfo,
};
pub use vulkan_image::{ImageOwnership, VulkanImage};
pub use vulkan_image_view::VulkanImageView;
pub use vulkan_texture::Texture;

// Re-export debug utilities
pub use debug::{validation_stats, print_validation_stats_report, ValidationStats};

/// Vulkan backend namespace
pub mod prism {
    pub use crate::vulkan_context::DeviceContext;
    pub use crate::vulkan_device::VulkanContext;
    pub use crate::vulkan_texture::Texture as VulkanTexture;
}
