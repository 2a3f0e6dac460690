/// VulkanImageView - RAII wrapper around a `vk::ImageView`

use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::DeviceContext;

/// Image view destroyed through its context on drop
pub struct VulkanImageView {
    ctx: Arc<dyn DeviceContext>,
    view: vk::ImageView,
}

impl VulkanImageView {
    pub(crate) fn new(ctx: Arc<dyn DeviceContext>, view: vk::ImageView) -> Self {
        Self { ctx, view }
    }

    /// Native view handle
    pub fn handle(&self) -> vk::ImageView {
        self.view
    }
}

impl Drop for VulkanImageView {
    fn drop(&mut self) {
        if self.view != vk::ImageView::null() {
            self.ctx.destroy_image_view(self.view);
        }
    }
}
