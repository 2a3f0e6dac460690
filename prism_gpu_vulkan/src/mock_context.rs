//! Recording DeviceContext for unit tests
//!
//! Hands out fake handles from a counter and records every call so tests can
//! check what a texture asked the device to do without a GPU.

use ash::vk::{self, Handle};
use gpu_allocator::vulkan::Allocation;
use prism_gpu::prism::render::TextureFormat;
use prism_gpu::prism::{Error, Result};
use prism_gpu::utils::SlotAllocator;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::vulkan_context::{DeviceContext, ImageBarrier, ImageCreateDesc, ImageViewDesc, NativeImage};
use crate::vulkan_format::depth_stencil_candidates;
use crate::vulkan_image::VulkanImage;
use crate::vulkan_staging::{copy_regions_2d, copy_regions_3d};

/// One recorded device call
#[derive(Debug, Clone)]
pub enum MockCall {
    CreateImage { image: vk::Image, desc: ImageCreateDesc },
    DestroyImage(vk::Image),
    CreateImageView { image: vk::Image, view: vk::ImageView, desc: ImageViewDesc },
    DestroyImageView(vk::ImageView),
    RegisterTexture { id: u32, view: vk::ImageView },
    UnregisterTexture(u32),
    ImageData2D {
        image: vk::Image,
        region: vk::Rect2D,
        mip_level: u32,
        num_mip_levels: u32,
        layer: u32,
        format: vk::Format,
        data: Vec<u8>,
    },
    ImageData3D {
        image: vk::Image,
        offset: vk::Offset3D,
        extent: vk::Extent3D,
        format: vk::Format,
        data: Vec<u8>,
    },
    AcquireImmediate(vk::CommandBuffer),
    SubmitImmediate(vk::CommandBuffer),
    Barrier(ImageBarrier),
    Blit { image: vk::Image, blit: vk::ImageBlit, filter: vk::Filter },
}

pub struct MockContext {
    calls: Mutex<Vec<MockCall>>,
    next_handle: AtomicU64,
    texture_ids: Mutex<SlotAllocator>,
    /// Make the next `create_image` calls fail
    pub fail_create_image: AtomicBool,
    /// Make the next `create_image_view` calls fail
    pub fail_create_image_view: AtomicBool,
    /// Answer for `supports_linear_blit`
    pub linear_blit: AtomicBool,
    /// Index into the depth candidate list the "device" supports
    pub depth_candidate: AtomicU64,
    /// Answer for `max_image_array_layers`
    pub max_array_layers: AtomicU32,
}

impl MockContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
            texture_ids: Mutex::new(SlotAllocator::with_reserved(1)),
            fail_create_image: AtomicBool::new(false),
            fail_create_image_view: AtomicBool::new(false),
            linear_blit: AtomicBool::new(true),
            depth_candidate: AtomicU64::new(0),
            max_array_layers: AtomicU32::new(2048),
        })
    }

    fn next_raw(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Snapshot of every recorded call
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| predicate(call)).count()
    }

    /// Every `create_image` descriptor, in call order
    pub fn created_images(&self) -> Vec<ImageCreateDesc> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::CreateImage { desc, .. } => Some(desc),
                _ => None,
            })
            .collect()
    }

    /// Every `create_image_view` descriptor, in call order
    pub fn created_views(&self) -> Vec<(vk::ImageView, ImageViewDesc)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::CreateImageView { view, desc, .. } => Some((view, desc)),
                _ => None,
            })
            .collect()
    }

    /// Number of staging copies (2D and 3D)
    pub fn transfer_count(&self) -> usize {
        self.count(|call| matches!(call, MockCall::ImageData2D { .. } | MockCall::ImageData3D { .. }))
    }

    pub fn submit_count(&self) -> usize {
        self.count(|call| matches!(call, MockCall::SubmitImmediate(_)))
    }

    /// Views created and not yet destroyed
    pub fn live_view_count(&self) -> usize {
        let created = self.count(|call| matches!(call, MockCall::CreateImageView { .. }));
        let destroyed = self.count(|call| matches!(call, MockCall::DestroyImageView(_)));
        created - destroyed
    }

    /// Images created and not yet destroyed
    pub fn live_image_count(&self) -> usize {
        let created = self.count(|call| matches!(call, MockCall::CreateImage { .. }));
        let destroyed = self.count(|call| matches!(call, MockCall::DestroyImage(_)));
        created - destroyed
    }

    pub fn live_texture_ids(&self) -> u32 {
        self.texture_ids.lock().unwrap().len()
    }

    /// Total number of calls recorded
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl DeviceContext for MockContext {
    fn create_image(&self, desc: &ImageCreateDesc) -> Result<NativeImage> {
        if self.fail_create_image.load(Ordering::Relaxed) {
            return Err(Error::OutOfMemory);
        }
        let image = vk::Image::from_raw(self.next_raw());
        self.record(MockCall::CreateImage { image, desc: desc.clone() });
        Ok(NativeImage { image, allocation: None })
    }

    fn destroy_image(&self, image: vk::Image, _allocation: Option<Allocation>) {
        self.record(MockCall::DestroyImage(image));
    }

    fn create_image_view(&self, image: vk::Image, desc: &ImageViewDesc) -> Result<vk::ImageView> {
        if self.fail_create_image_view.load(Ordering::Relaxed) {
            return Err(Error::BackendError("mock view failure".to_string()));
        }
        let view = vk::ImageView::from_raw(self.next_raw());
        self.record(MockCall::CreateImageView { image, view, desc: desc.clone() });
        Ok(view)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.record(MockCall::DestroyImageView(view));
    }

    fn closest_depth_stencil_format(&self, format: TextureFormat) -> vk::Format {
        let candidates = depth_stencil_candidates(format);
        let index = self.depth_candidate.load(Ordering::Relaxed) as usize;
        candidates
            .get(index)
            .or_else(|| candidates.first())
            .copied()
            .unwrap_or(vk::Format::UNDEFINED)
    }

    fn supports_linear_blit(&self, _format: vk::Format) -> bool {
        self.linear_blit.load(Ordering::Relaxed)
    }

    fn max_image_array_layers(&self) -> u32 {
        self.max_array_layers.load(Ordering::Relaxed)
    }

    fn register_texture(&self, view: vk::ImageView) -> u32 {
        let id = self.texture_ids.lock().unwrap().alloc();
        self.record(MockCall::RegisterTexture { id, view });
        id
    }

    fn unregister_texture(&self, texture_id: u32) {
        self.texture_ids.lock().unwrap().free(texture_id);
        self.record(MockCall::UnregisterTexture(texture_id));
    }

    fn image_data_2d(
        &self,
        image: &VulkanImage,
        region: vk::Rect2D,
        mip_level: u32,
        num_mip_levels: u32,
        layer: u32,
        format: vk::Format,
        data: &[u8],
    ) -> Result<()> {
        // Same region sizing as the staging path of the real device
        copy_regions_2d(region, mip_level, num_mip_levels, layer, format, image.aspect(), data.len())?;
        self.record(MockCall::ImageData2D {
            image: image.handle(),
            region,
            mip_level,
            num_mip_levels,
            layer,
            format,
            data: data.to_vec(),
        });
        image.set_layout(image.resting_layout());
        Ok(())
    }

    fn image_data_3d(
        &self,
        image: &VulkanImage,
        offset: vk::Offset3D,
        extent: vk::Extent3D,
        format: vk::Format,
        data: &[u8],
    ) -> Result<()> {
        copy_regions_3d(offset, extent, format, image.aspect(), data.len())?;
        self.record(MockCall::ImageData3D {
            image: image.handle(),
            offset,
            extent,
            format,
            data: data.to_vec(),
        });
        image.set_layout(image.resting_layout());
        Ok(())
    }

    fn acquire_immediate(&self) -> Result<vk::CommandBuffer> {
        let cmd = vk::CommandBuffer::from_raw(self.next_raw());
        self.record(MockCall::AcquireImmediate(cmd));
        Ok(cmd)
    }

    fn submit_immediate(&self, cmd: vk::CommandBuffer) -> Result<()> {
        self.record(MockCall::SubmitImmediate(cmd));
        Ok(())
    }

    fn cmd_image_barrier(&self, _cmd: vk::CommandBuffer, barrier: &ImageBarrier) {
        self.record(MockCall::Barrier(*barrier));
    }

    fn cmd_blit_image(
        &self,
        _cmd: vk::CommandBuffer,
        image: vk::Image,
        blit: &vk::ImageBlit,
        filter: vk::Filter,
    ) {
        self.record(MockCall::Blit { image, blit: *blit, filter });
    }
}
