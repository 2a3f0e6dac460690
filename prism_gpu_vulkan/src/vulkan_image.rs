/// VulkanImage - Native image, its memory and its tracked layout
///
/// The layout tracked here is the layout the image will be in once every
/// command recorded so far has executed. Staging copies and mip generation
/// read it as the "old" layout of their first barrier and store the final one.

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use prism_gpu::prism::render::mip_extent;
use prism_gpu::prism::Result;
use std::sync::{Arc, Mutex};

use crate::vulkan_context::{DeviceContext, ImageBarrier, ImageCreateDesc, ImageViewDesc};
use crate::vulkan_image_view::VulkanImageView;

/// Who destroys the native image
pub enum ImageOwnership {
    /// Created through the context; image and memory are released on drop
    Owned { allocation: Option<Allocation> },
    /// Owned elsewhere (swapchain images); never destroyed here
    External,
}

/// Native image resource
pub struct VulkanImage {
    ctx: Arc<dyn DeviceContext>,
    image: vk::Image,
    ownership: ImageOwnership,
    image_type: vk::ImageType,
    format: vk::Format,
    extent: vk::Extent3D,
    mip_levels: u32,
    array_layers: u32,
    samples: vk::SampleCountFlags,
    usage: vk::ImageUsageFlags,
    aspect: vk::ImageAspectFlags,
    layout: Mutex<vk::ImageLayout>,
}

impl VulkanImage {
    /// Allocate an image through the context
    pub fn create(
        ctx: Arc<dyn DeviceContext>,
        desc: &ImageCreateDesc,
        aspect: vk::ImageAspectFlags,
    ) -> Result<Self> {
        let native = ctx.create_image(desc)?;

        Ok(Self {
            ctx,
            image: native.image,
            ownership: ImageOwnership::Owned { allocation: native.allocation },
            image_type: desc.image_type,
            format: desc.format,
            extent: desc.extent,
            mip_levels: desc.mip_levels,
            array_layers: desc.array_layers,
            samples: desc.samples,
            usage: desc.usage,
            aspect,
            layout: Mutex::new(vk::ImageLayout::UNDEFINED),
        })
    }

    /// Wrap an externally owned 2D image (single mip, single layer)
    pub fn from_external(
        ctx: Arc<dyn DeviceContext>,
        image: vk::Image,
        format: vk::Format,
        extent: vk::Extent2D,
        usage: vk::ImageUsageFlags,
    ) -> Self {
        Self {
            ctx,
            image,
            ownership: ImageOwnership::External,
            image_type: vk::ImageType::TYPE_2D,
            format,
            extent: vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            usage,
            aspect: vk::ImageAspectFlags::COLOR,
            layout: Mutex::new(vk::ImageLayout::UNDEFINED),
        }
    }

    // ===== ACCESSORS =====

    pub fn handle(&self) -> vk::Image {
        self.image
    }

    pub fn image_type(&self) -> vk::ImageType {
        self.image_type
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent3D {
        self.extent
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn array_layers(&self) -> u32 {
        self.array_layers
    }

    pub fn samples(&self) -> vk::SampleCountFlags {
        self.samples
    }

    pub fn usage(&self) -> vk::ImageUsageFlags {
        self.usage
    }

    pub fn aspect(&self) -> vk::ImageAspectFlags {
        self.aspect
    }

    pub fn ownership(&self) -> &ImageOwnership {
        &self.ownership
    }

    /// True for images this crate must never destroy
    pub fn is_externally_managed(&self) -> bool {
        matches!(self.ownership, ImageOwnership::External)
    }

    // ===== LAYOUT TRACKING =====

    /// Current tracked layout
    pub fn layout(&self) -> vk::ImageLayout {
        *self.layout.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_layout(&self, layout: vk::ImageLayout) {
        *self.layout.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = layout;
    }

    /// Layout the image rests in after transfers
    ///
    /// SHADER_READ_ONLY_OPTIMAL for sampled images, GENERAL otherwise.
    pub fn resting_layout(&self) -> vk::ImageLayout {
        if self.usage.contains(vk::ImageUsageFlags::SAMPLED) {
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        } else {
            vk::ImageLayout::GENERAL
        }
    }

    /// Subresource range covering every mip level and layer
    pub fn full_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect,
            base_mip_level: 0,
            level_count: self.mip_levels,
            base_array_layer: 0,
            layer_count: self.array_layers,
        }
    }

    /// Barrier moving mip levels `base_mip_level..base_mip_level + level_count`
    /// of every layer from `old_layout` to `new_layout`
    pub fn transition(
        &self,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        base_mip_level: u32,
        level_count: u32,
    ) -> ImageBarrier {
        let (src_stage, src_access) = stage_and_access(old_layout);
        let (dst_stage, dst_access) = stage_and_access(new_layout);

        ImageBarrier {
            image: self.image,
            old_layout,
            new_layout,
            src_stage,
            dst_stage,
            src_access,
            dst_access,
            range: vk::ImageSubresourceRange {
                base_mip_level,
                level_count,
                ..self.full_range()
            },
        }
    }

    // ===== VIEWS =====

    /// Create a view owned by the returned wrapper
    pub fn create_image_view(&self, desc: &ImageViewDesc) -> Result<VulkanImageView> {
        let view = self.ctx.create_image_view(self.image, desc)?;
        Ok(VulkanImageView::new(Arc::clone(&self.ctx), view))
    }

    // ===== MIPMAPS =====

    /// Record blits filling mip levels 1.. from level 0
    ///
    /// Level 0 must hold data. Every level ends in the resting layout.
    pub fn record_mipmap_generation(&self, cmd: vk::CommandBuffer) {
        let levels = self.mip_levels;
        if levels <= 1 {
            return;
        }

        let filter = if self.ctx.supports_linear_blit(self.format) {
            vk::Filter::LINEAR
        } else {
            vk::Filter::NEAREST
        };

        let current = self.layout();
        self.ctx.cmd_image_barrier(
            cmd,
            &self.transition(current, vk::ImageLayout::TRANSFER_SRC_OPTIMAL, 0, 1),
        );
        self.ctx.cmd_image_barrier(
            cmd,
            &self.transition(
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                1,
                levels - 1,
            ),
        );

        for level in 1..levels {
            let blit = vk::ImageBlit::default()
                .src_subresource(self.subresource_layers(level - 1))
                .src_offsets([vk::Offset3D::default(), self.level_end(level - 1)])
                .dst_subresource(self.subresource_layers(level))
                .dst_offsets([vk::Offset3D::default(), self.level_end(level)]);

            self.ctx.cmd_blit_image(cmd, self.image, &blit, filter);

            // The freshly written level becomes the next blit source
            self.ctx.cmd_image_barrier(
                cmd,
                &self.transition(
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    level,
                    1,
                ),
            );
        }

        let resting = self.resting_layout();
        self.ctx.cmd_image_barrier(
            cmd,
            &self.transition(vk::ImageLayout::TRANSFER_SRC_OPTIMAL, resting, 0, levels),
        );
        self.set_layout(resting);
    }

    fn subresource_layers(&self, mip_level: u32) -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers {
            aspect_mask: self.aspect,
            mip_level,
            base_array_layer: 0,
            layer_count: self.array_layers,
        }
    }

    fn level_end(&self, mip_level: u32) -> vk::Offset3D {
        let depth = if self.image_type == vk::ImageType::TYPE_3D {
            mip_extent(self.extent.depth, mip_level)
        } else {
            1
        };
        vk::Offset3D {
            x: mip_extent(self.extent.width, mip_level) as i32,
            y: mip_extent(self.extent.height, mip_level) as i32,
            z: depth as i32,
        }
    }
}

/// Pipeline stage and access mask that touch an image in `layout`
fn stage_and_access(layout: vk::ImageLayout) -> (vk::PipelineStageFlags, vk::AccessFlags) {
    match layout {
        vk::ImageLayout::UNDEFINED => (vk::PipelineStageFlags::TOP_OF_PIPE, vk::AccessFlags::empty()),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => {
            (vk::PipelineStageFlags::TRANSFER, vk::AccessFlags::TRANSFER_WRITE)
        }
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => {
            (vk::PipelineStageFlags::TRANSFER, vk::AccessFlags::TRANSFER_READ)
        }
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            vk::PipelineStageFlags::FRAGMENT_SHADER | vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::AccessFlags::SHADER_READ,
        ),
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        ),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => (
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        ),
        vk::ImageLayout::PRESENT_SRC_KHR => {
            (vk::PipelineStageFlags::BOTTOM_OF_PIPE, vk::AccessFlags::empty())
        }
        _ => (
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
        ),
    }
}

impl Drop for VulkanImage {
    fn drop(&mut self) {
        match &mut self.ownership {
            ImageOwnership::Owned { allocation } => {
                self.ctx.destroy_image(self.image, allocation.take());
            }
            ImageOwnership::External => {}
        }
    }
}

#[cfg(test)]
#[path = "vulkan_image_tests.rs"]
mod tests;
