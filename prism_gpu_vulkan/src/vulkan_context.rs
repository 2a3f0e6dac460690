/// DeviceContext - The device collaborator used by every image resource
///
/// Textures never talk to `ash::Device` directly. Everything that needs the
/// device goes through this trait:
/// - Image and view creation/destruction (memory included)
/// - Depth format fallback and blit filter support queries
/// - Texture id registration for shader-visible tables
/// - Staging copies into images
/// - Transient command buffers for blocking one-shot work

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use prism_gpu::prism::render::TextureFormat;
use prism_gpu::prism::Result;

use crate::vulkan_image::VulkanImage;

/// Parameters for a native image allocation
#[derive(Debug, Clone)]
pub struct ImageCreateDesc {
    pub image_type: vk::ImageType,
    pub extent: vk::Extent3D,
    pub format: vk::Format,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: vk::SampleCountFlags,
    pub tiling: vk::ImageTiling,
    pub usage: vk::ImageUsageFlags,
    pub memory_flags: vk::MemoryPropertyFlags,
    pub flags: vk::ImageCreateFlags,
    /// Attached as the image's debug name when non-empty
    pub debug_name: String,
}

/// A freshly allocated image and its backing memory
pub struct NativeImage {
    pub image: vk::Image,
    /// `None` when the context manages memory elsewhere (mock contexts)
    pub allocation: Option<Allocation>,
}

/// Parameters for an image view
#[derive(Debug, Clone)]
pub struct ImageViewDesc {
    pub view_type: vk::ImageViewType,
    pub format: vk::Format,
    pub aspect: vk::ImageAspectFlags,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
    /// Attached as the view's debug name when non-empty
    pub debug_name: String,
}

/// A single image layout transition
#[derive(Debug, Clone, Copy)]
pub struct ImageBarrier {
    pub image: vk::Image,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub range: vk::ImageSubresourceRange,
}

/// Device collaborator trait
///
/// Implemented by [`VulkanContext`](crate::VulkanContext) for real devices and
/// by a recording mock in unit tests. A single submitting thread per context
/// is assumed.
pub trait DeviceContext: Send + Sync {
    // ===== IMAGES & VIEWS =====

    /// Create an image and bind memory matching `desc.memory_flags`
    fn create_image(&self, desc: &ImageCreateDesc) -> Result<NativeImage>;

    /// Destroy an image created by `create_image` and free its memory
    fn destroy_image(&self, image: vk::Image, allocation: Option<Allocation>);

    /// Create a view over `image`
    fn create_image_view(&self, image: vk::Image, desc: &ImageViewDesc) -> Result<vk::ImageView>;

    fn destroy_image_view(&self, view: vk::ImageView);

    // ===== FORMAT QUERIES =====

    /// Closest depth/stencil format the device supports as an optimal-tiling
    /// attachment for a logical depth/stencil format
    fn closest_depth_stencil_format(&self, format: TextureFormat) -> vk::Format;

    /// Whether `format` supports linear filtering in blits
    fn supports_linear_blit(&self, format: vk::Format) -> bool;

    /// `maxImageArrayLayers` of the physical device
    fn max_image_array_layers(&self) -> u32;

    // ===== TEXTURE IDS =====

    /// Register a full-resource view and return its texture id (never 0)
    fn register_texture(&self, view: vk::ImageView) -> u32;

    /// Release a texture id returned by `register_texture`
    fn unregister_texture(&self, texture_id: u32);

    // ===== STAGING =====

    /// Copy tightly packed pixel data into a 2D region of one layer
    ///
    /// `data` holds `num_mip_levels` consecutive levels starting at
    /// `mip_level`, each covering `region` scaled down by the level offset.
    /// The image's tracked layout is updated to its shader-readable layout.
    #[allow(clippy::too_many_arguments)]
    fn image_data_2d(
        &self,
        image: &VulkanImage,
        region: vk::Rect2D,
        mip_level: u32,
        num_mip_levels: u32,
        layer: u32,
        format: vk::Format,
        data: &[u8],
    ) -> Result<()>;

    /// Copy tightly packed voxel data into a 3D region of mip level 0
    fn image_data_3d(
        &self,
        image: &VulkanImage,
        offset: vk::Offset3D,
        extent: vk::Extent3D,
        format: vk::Format,
        data: &[u8],
    ) -> Result<()>;

    // ===== IMMEDIATE COMMANDS =====

    /// Begin a transient primary command buffer
    fn acquire_immediate(&self) -> Result<vk::CommandBuffer>;

    /// End, submit and wait for a command buffer from `acquire_immediate`
    fn submit_immediate(&self, cmd: vk::CommandBuffer) -> Result<()>;

    fn cmd_image_barrier(&self, cmd: vk::CommandBuffer, barrier: &ImageBarrier);

    /// Record a blit within one image (TRANSFER_SRC -> TRANSFER_DST)
    fn cmd_blit_image(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        blit: &vk::ImageBlit,
        filter: vk::Filter,
    );
}
