/// Staging uploads: host data -> CPU-visible buffer -> image copy on the GPU

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::{AllocationError, MemoryLocation};
use prism_gpu::prism::render::mip_extent;
use prism_gpu::prism::{Error, Result};
use prism_gpu::{gpu_err, gpu_error, gpu_trace, gpu_warn};

use crate::vulkan_context::DeviceContext;
use crate::vulkan_device::{VulkanContext, LOG_SOURCE};
use crate::vulkan_format::{copy_texel_layout, CopyTexelLayout};
use crate::vulkan_image::VulkanImage;

/// One copy region plus the byte range of `data` it reads
#[derive(Debug, Clone, Copy)]
pub(crate) struct CopyRegion {
    pub(crate) mip_level: u32,
    pub(crate) layer: u32,
    pub(crate) offset: vk::Offset3D,
    pub(crate) extent: vk::Extent3D,
    pub(crate) buffer_offset: usize,
    pub(crate) size: usize,
}

fn texel_layout_of(format: vk::Format, aspect: vk::ImageAspectFlags) -> Result<CopyTexelLayout> {
    copy_texel_layout(format, aspect).ok_or_else(|| {
        gpu_error!(LOG_SOURCE, "No staging layout known for {:?} ({:?})", format, aspect);
        Error::Unimplemented(format!("staging copy for {:?} ({:?})", format, aspect))
    })
}

fn check_len(required: usize, available: usize) -> Result<()> {
    if available < required {
        gpu_error!(
            LOG_SOURCE,
            "Upload data too short: {} bytes provided, {} required",
            available,
            required
        );
        return Err(Error::ArgumentOutOfRange(format!(
            "upload needs {} bytes, got {}",
            required, available
        )));
    }
    Ok(())
}

/// Regions for `num_mip_levels` consecutive levels of one layer, tightly packed in `data`
///
/// `region` describes the first level; each following level halves the
/// offset and extent. Sizes follow the native `format` restricted to `aspect`.
pub(crate) fn copy_regions_2d(
    region: vk::Rect2D,
    mip_level: u32,
    num_mip_levels: u32,
    layer: u32,
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
    data_len: usize,
) -> Result<Vec<CopyRegion>> {
    let texels = texel_layout_of(format, aspect)?;

    let mut regions = Vec::with_capacity(num_mip_levels as usize);
    let mut buffer_offset = 0usize;
    for i in 0..num_mip_levels {
        let size = texels.bytes_per_slice(region.extent.width, region.extent.height, 1, i);
        regions.push(CopyRegion {
            mip_level: mip_level + i,
            layer,
            offset: vk::Offset3D {
                x: region.offset.x >> i,
                y: region.offset.y >> i,
                z: 0,
            },
            extent: vk::Extent3D {
                width: mip_extent(region.extent.width, i),
                height: mip_extent(region.extent.height, i),
                depth: 1,
            },
            buffer_offset,
            size,
        });
        buffer_offset += size;
    }

    check_len(buffer_offset, data_len)?;
    Ok(regions)
}

/// Single region covering a box of mip 0
pub(crate) fn copy_regions_3d(
    offset: vk::Offset3D,
    extent: vk::Extent3D,
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
    data_len: usize,
) -> Result<Vec<CopyRegion>> {
    let size = texel_layout_of(format, aspect)?.bytes_per_slice(extent.width, extent.height, extent.depth, 0);
    check_len(size, data_len)?;

    Ok(vec![CopyRegion {
        mip_level: 0,
        layer: 0,
        offset,
        extent,
        buffer_offset: 0,
        size,
    }])
}

/// CPU-visible transfer source buffer, destroyed on drop
struct StagingBuffer<'a> {
    ctx: &'a VulkanContext,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
}

impl<'a> StagingBuffer<'a> {
    fn new(ctx: &'a VulkanContext, data: &[u8]) -> Result<Self> {
        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(data.len() as u64)
                .usage(vk::BufferUsageFlags::TRANSFER_SRC)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx
                .device
                .create_buffer(&create_info, None)
                .map_err(|e| gpu_err!(LOG_SOURCE, "Failed to create staging buffer: {:?}", e))?;

            // From here on, drop releases whatever was created
            let mut staging = Self {
                ctx,
                buffer,
                allocation: None,
            };

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = ctx
                .allocator()
                .allocate(&AllocationCreateDesc {
                    name: "texture_staging_buffer",
                    requirements,
                    location: MemoryLocation::CpuToGpu,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| match e {
                    AllocationError::OutOfMemory => {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        gpu_error!(LOG_SOURCE, "Out of GPU memory for staging buffer ({:.2} MB)", size_mb);
                        Error::OutOfMemory
                    }
                    other => gpu_err!(LOG_SOURCE, "Failed to allocate staging memory: {:?}", other),
                })?;

            ctx.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| gpu_err!(LOG_SOURCE, "Failed to bind staging buffer memory: {:?}", e))?;

            let mapped_ptr = allocation
                .mapped_ptr()
                .ok_or_else(|| gpu_err!(LOG_SOURCE, "Staging buffer is not mapped"))?
                .as_ptr() as *mut u8;
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr, data.len());

            staging.allocation = Some(allocation);
            Ok(staging)
        }
    }
}

impl Drop for StagingBuffer<'_> {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
        if let Some(allocation) = self.allocation.take() {
            if let Err(e) = self.ctx.allocator().free(allocation) {
                gpu_warn!(LOG_SOURCE, "Failed to free staging memory: {:?}", e);
            }
        }
    }
}

impl VulkanContext {
    /// Copy `data` into `image` and leave it in its resting layout
    ///
    /// Blocks until the copy has completed on the GPU.
    pub(crate) fn upload_to_image(
        &self,
        image: &VulkanImage,
        regions: &[CopyRegion],
        data: &[u8],
    ) -> Result<()> {
        let used = regions
            .iter()
            .map(|r| r.buffer_offset + r.size)
            .max()
            .unwrap_or(0);
        if used == 0 {
            return Ok(());
        }
        let data = &data[..used];

        let staging = StagingBuffer::new(self, data)?;
        // Depth/stencil copies address a single aspect
        let aspect = image.aspect();

        let copies: Vec<vk::BufferImageCopy> = regions
            .iter()
            .map(|r| {
                vk::BufferImageCopy::default()
                    .buffer_offset(r.buffer_offset as u64)
                    .buffer_row_length(0)
                    .buffer_image_height(0)
                    .image_subresource(vk::ImageSubresourceLayers {
                        aspect_mask: aspect,
                        mip_level: r.mip_level,
                        base_array_layer: r.layer,
                        layer_count: 1,
                    })
                    .image_offset(r.offset)
                    .image_extent(r.extent)
            })
            .collect();

        let full = image.full_range();
        let resting = image.resting_layout();

        let cmd = self.acquire_immediate()?;
        self.cmd_image_barrier(
            cmd,
            &image.transition(image.layout(), vk::ImageLayout::TRANSFER_DST_OPTIMAL, 0, full.level_count),
        );
        unsafe {
            self.device.cmd_copy_buffer_to_image(
                cmd,
                staging.buffer,
                image.handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &copies,
            );
        }
        self.cmd_image_barrier(
            cmd,
            &image.transition(vk::ImageLayout::TRANSFER_DST_OPTIMAL, resting, 0, full.level_count),
        );
        self.submit_immediate(cmd)?;
        image.set_layout(resting);

        gpu_trace!(
            LOG_SOURCE,
            "Uploaded {} bytes in {} region(s) to image {:?}",
            used,
            copies.len(),
            image.handle()
        );

        Ok(())
    }
}

#[cfg(test)]
#[path = "vulkan_staging_tests.rs"]
mod tests;
