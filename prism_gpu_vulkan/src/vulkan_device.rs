/// VulkanContext - Headless Vulkan device implementing DeviceContext
///
/// Owns everything textures need from the device:
/// - Instance, physical device, logical device and one graphics queue
/// - GPU memory allocator (gpu-allocator)
/// - Transient command pool + fence for blocking one-shot submissions
/// - Texture id table (id -> full view)
/// - Format properties cache
///
/// Textures keep the context alive through `Arc<dyn DeviceContext>`, so the
/// context is always dropped after the last texture.

use ash::vk::{self, Handle};
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::{AllocationError, MemoryLocation};
use prism_gpu::prism::render::{DeviceConfig, TextureFormat};
use prism_gpu::prism::{Error, Result};
use prism_gpu::utils::SlotAllocator;
use prism_gpu::{gpu_debug, gpu_err, gpu_error, gpu_info, gpu_warn};
use rustc_hash::FxHashMap;
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::vulkan_context::{DeviceContext, ImageBarrier, ImageCreateDesc, ImageViewDesc, NativeImage};
use crate::vulkan_format::depth_stencil_candidates;
use crate::vulkan_image::VulkanImage;
use crate::vulkan_staging::{copy_regions_2d, copy_regions_3d};

pub(crate) const LOG_SOURCE: &str = "prism::vulkan::Context";

const VALIDATION_LAYER: &std::ffi::CStr = c"VK_LAYER_KHRONOS_validation";

/// Pool and fence for blocking one-shot command buffers
pub(crate) struct ImmediateCommands {
    pub(crate) pool: vk::CommandPool,
    pub(crate) fence: vk::Fence,
}

/// Texture id -> full-resource view
struct TextureTable {
    ids: SlotAllocator,
    views: Vec<vk::ImageView>,
}

/// Headless Vulkan device context
pub struct VulkanContext {
    /// Vulkan entry (keeps the loader library alive)
    _entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,

    /// Graphics queue (submissions are serialized by `immediate`)
    pub(crate) queue: vk::Queue,
    queue_family: u32,
    limits: vk::PhysicalDeviceLimits,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop to ensure it's dropped BEFORE the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,

    pub(crate) immediate: Mutex<ImmediateCommands>,
    textures: Mutex<TextureTable>,
    format_properties: Mutex<FxHashMap<vk::Format, vk::FormatProperties>>,

    /// Debug utils (object names), present when validation is enabled
    debug_utils_device: Option<ash::ext::debug_utils::Device>,
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl VulkanContext {
    /// Create a headless context
    ///
    /// # Arguments
    ///
    /// * `config` - Device configuration (validation, app info, GPU preference)
    pub fn new(config: &DeviceConfig) -> Result<Arc<Self>> {
        unsafe {
            // Create Vulkan Entry
            let entry = ash::Entry::load().map_err(|e| {
                gpu_error!(LOG_SOURCE, "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            // Application Info
            let app_name = CString::new(config.app_name.as_str()).map_err(|e| {
                Error::InitializationFailed(format!("Invalid app name: {}", e))
            })?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(
                    0,
                    config.app_version.0,
                    config.app_version.1,
                    config.app_version.2,
                ))
                .engine_name(c"Prism")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let enable_validation =
                validation_requested(config) && validation_layer_available(&entry);

            // Validation layer + debug utils extension
            let (layer_names, extension_names) = if enable_validation {
                (
                    vec![VALIDATION_LAYER.as_ptr()],
                    vec![ash::ext::debug_utils::NAME.as_ptr()],
                )
            } else {
                (vec![], vec![])
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                gpu_error!(LOG_SOURCE, "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            // Setup debug messenger if validation is enabled
            #[cfg(feature = "vulkan-validation")]
            let (debug_utils_loader, debug_messenger) = if enable_validation {
                let (loader, messenger) =
                    crate::debug::create_debug_messenger(&entry, &instance, config.debug_severity)?;
                (Some(loader), Some(messenger))
            } else {
                (None, None)
            };
            #[cfg(not(feature = "vulkan-validation"))]
            let (debug_utils_loader, debug_messenger) = (None, None);

            // Pick Physical Device
            let (physical_device, queue_family) =
                pick_physical_device(&instance, config.prefer_discrete_gpu)?;
            let limits = instance.get_physical_device_properties(physical_device).limits;

            // Create Logical Device
            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family)
                .queue_priorities(&queue_priorities)];

            let device_create_info =
                vk::DeviceCreateInfo::default().queue_create_infos(&queue_create_infos);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    gpu_error!(LOG_SOURCE, "Failed to create device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let queue = device.get_device_queue(queue_family, 0);

            // Create GPU allocator
            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                gpu_error!(LOG_SOURCE, "Failed to create allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            // Create immediate command pool (TRANSIENT + RESET for reusable one-shot work)
            let pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_family)
                .flags(
                    vk::CommandPoolCreateFlags::TRANSIENT
                        | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
                );
            let pool = device.create_command_pool(&pool_create_info, None).map_err(|e| {
                gpu_error!(LOG_SOURCE, "Failed to create immediate command pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
            })?;

            let fence = device
                .create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| {
                    gpu_error!(LOG_SOURCE, "Failed to create immediate fence: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create fence: {:?}", e))
                })?;

            let debug_utils_device = if enable_validation {
                Some(ash::ext::debug_utils::Device::new(&instance, &device))
            } else {
                None
            };

            gpu_info!(
                LOG_SOURCE,
                "Vulkan context ready (queue family {}, validation {})",
                queue_family,
                if enable_validation { "on" } else { "off" }
            );

            Ok(Arc::new(Self {
                _entry: entry,
                instance,
                physical_device,
                device,
                queue,
                queue_family,
                limits,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                immediate: Mutex::new(ImmediateCommands { pool, fence }),
                textures: Mutex::new(TextureTable {
                    ids: SlotAllocator::with_reserved(1),
                    views: vec![vk::ImageView::null()],
                }),
                format_properties: Mutex::new(FxHashMap::default()),
                debug_utils_device,
                debug_utils_loader,
                debug_messenger,
            }))
        }
    }

    // ===== ACCESSORS =====

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Full view registered under `texture_id`
    pub fn texture_view(&self, texture_id: u32) -> Option<vk::ImageView> {
        let table = lock(&self.textures);
        if !table.ids.is_live(texture_id) {
            return None;
        }
        table.views.get(texture_id as usize).copied()
    }

    /// Number of live texture ids
    pub fn texture_count(&self) -> u32 {
        lock(&self.textures).ids.len()
    }

    /// Wait until the device is idle
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| gpu_err!(LOG_SOURCE, "Failed to wait for device idle: {:?}", e))
        }
    }

    // ===== INTERNAL HELPERS =====

    pub(crate) fn allocator(&self) -> MutexGuard<'_, Allocator> {
        lock(&self.allocator)
    }

    /// Cached format properties of the physical device
    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        *lock(&self.format_properties)
            .entry(format)
            .or_insert_with(|| unsafe {
                self.instance
                    .get_physical_device_format_properties(self.physical_device, format)
            })
    }

    /// Attach a debug name when debug utils are available
    pub(crate) fn set_object_name<H: Handle>(&self, handle: H, name: &str) {
        let Some(debug_utils) = &self.debug_utils_device else {
            return;
        };
        if name.is_empty() {
            return;
        }
        let Ok(name) = CString::new(name) else {
            return;
        };

        let name_info = vk::DebugUtilsObjectNameInfoEXT::default()
            .object_handle(handle)
            .object_name(&name);
        unsafe {
            if let Err(e) = debug_utils.set_debug_utils_object_name(&name_info) {
                gpu_warn!(LOG_SOURCE, "Failed to set object name {:?}: {:?}", name, e);
            }
        }
    }
}

/// Lock a mutex, recovering the data if a panicking thread poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn validation_requested(config: &DeviceConfig) -> bool {
    if !config.enable_validation {
        return false;
    }
    if cfg!(feature = "vulkan-validation") {
        true
    } else {
        gpu_warn!(
            LOG_SOURCE,
            "Validation requested but the 'vulkan-validation' feature is disabled; ignoring"
        );
        false
    }
}

unsafe fn validation_layer_available(entry: &ash::Entry) -> bool {
    let available = entry
        .enumerate_instance_layer_properties()
        .map(|layers| {
            layers
                .iter()
                .any(|layer| {
                    layer
                        .layer_name_as_c_str()
                        .map(|name| name == VALIDATION_LAYER)
                        .unwrap_or(false)
                })
        })
        .unwrap_or(false);

    if !available {
        gpu_warn!(LOG_SOURCE, "Validation layer not installed; continuing without it");
    }
    available
}

/// First device with a graphics queue, discrete GPUs first when preferred
unsafe fn pick_physical_device(
    instance: &ash::Instance,
    prefer_discrete: bool,
) -> Result<(vk::PhysicalDevice, u32)> {
    let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
        gpu_error!(LOG_SOURCE, "Failed to enumerate physical devices: {:?}", e);
        Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
    })?;

    let candidates: Vec<(vk::PhysicalDevice, u32, vk::PhysicalDeviceProperties)> = physical_devices
        .into_iter()
        .filter_map(|physical_device| {
            let queue_family = instance
                .get_physical_device_queue_family_properties(physical_device)
                .iter()
                .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))?;
            let properties = instance.get_physical_device_properties(physical_device);
            Some((physical_device, queue_family as u32, properties))
        })
        .collect();

    let chosen = candidates
        .iter()
        .find(|(_, _, props)| {
            prefer_discrete && props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
        })
        .or_else(|| candidates.first())
        .ok_or_else(|| {
            gpu_error!(LOG_SOURCE, "No Vulkan-capable GPU with a graphics queue found");
            Error::InitializationFailed("No Vulkan-capable GPU found".to_string())
        })?;

    gpu_info!(
        LOG_SOURCE,
        "Using GPU {:?} ({:?})",
        chosen.2.device_name_as_c_str().unwrap_or(c"unknown"),
        chosen.2.device_type
    );

    Ok((chosen.0, chosen.1))
}

impl DeviceContext for VulkanContext {
    fn create_image(&self, desc: &ImageCreateDesc) -> Result<NativeImage> {
        unsafe {
            let create_info = vk::ImageCreateInfo::default()
                .image_type(desc.image_type)
                .format(desc.format)
                .extent(desc.extent)
                .mip_levels(desc.mip_levels)
                .array_layers(desc.array_layers)
                .samples(desc.samples)
                .tiling(desc.tiling)
                .usage(desc.usage)
                .flags(desc.flags)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = self
                .device
                .create_image(&create_info, None)
                .map_err(|e| gpu_err!(LOG_SOURCE, "Failed to create image: {:?}", e))?;

            let requirements = self.device.get_image_memory_requirements(image);
            let location = if desc.memory_flags.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
                MemoryLocation::CpuToGpu
            } else {
                MemoryLocation::GpuOnly
            };

            let allocation = self.allocator().allocate(&AllocationCreateDesc {
                name: if desc.debug_name.is_empty() { "texture" } else { desc.debug_name.as_str() },
                requirements,
                location,
                linear: desc.tiling == vk::ImageTiling::LINEAR,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_image(image, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    return Err(match e {
                        AllocationError::OutOfMemory => {
                            gpu_error!(
                                LOG_SOURCE,
                                "Out of GPU memory for image {}x{}x{} ({:.2} MB)",
                                desc.extent.width,
                                desc.extent.height,
                                desc.extent.depth,
                                size_mb
                            );
                            Error::OutOfMemory
                        }
                        other => gpu_err!(LOG_SOURCE, "Failed to allocate image memory: {:?}", other),
                    });
                }
            };

            if let Err(e) = self
                .device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
            {
                self.device.destroy_image(image, None);
                self.allocator().free(allocation).ok();
                return Err(gpu_err!(LOG_SOURCE, "Failed to bind image memory: {:?}", e));
            }

            self.set_object_name(image, &desc.debug_name);

            Ok(NativeImage {
                image,
                allocation: Some(allocation),
            })
        }
    }

    fn destroy_image(&self, image: vk::Image, allocation: Option<Allocation>) {
        unsafe {
            self.device.destroy_image(image, None);
        }
        if let Some(allocation) = allocation {
            if let Err(e) = self.allocator().free(allocation) {
                gpu_warn!(LOG_SOURCE, "Failed to free image memory: {:?}", e);
            }
        }
    }

    fn create_image_view(&self, image: vk::Image, desc: &ImageViewDesc) -> Result<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(desc.view_type)
            .format(desc.format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: desc.aspect,
                base_mip_level: desc.base_mip_level,
                level_count: desc.level_count,
                base_array_layer: desc.base_array_layer,
                layer_count: desc.layer_count,
            });

        let view = unsafe {
            self.device
                .create_image_view(&create_info, None)
                .map_err(|e| gpu_err!(LOG_SOURCE, "Failed to create image view: {:?}", e))?
        };
        self.set_object_name(view, &desc.debug_name);
        Ok(view)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe {
            self.device.destroy_image_view(view, None);
        }
    }

    fn closest_depth_stencil_format(&self, format: TextureFormat) -> vk::Format {
        let candidates = depth_stencil_candidates(format);

        for &candidate in candidates {
            let features = self.format_properties(candidate).optimal_tiling_features;
            if features.contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT) {
                if Some(&candidate) != candidates.first() {
                    gpu_debug!(LOG_SOURCE, "{:?} unsupported, using {:?}", format, candidate);
                }
                return candidate;
            }
        }

        let fallback = candidates.first().copied().unwrap_or(vk::Format::UNDEFINED);
        gpu_warn!(
            LOG_SOURCE,
            "No supported depth/stencil format for {:?}, using {:?}",
            format,
            fallback
        );
        fallback
    }

    fn supports_linear_blit(&self, format: vk::Format) -> bool {
        let features = self.format_properties(format).optimal_tiling_features;
        features.contains(
            vk::FormatFeatureFlags::BLIT_SRC
                | vk::FormatFeatureFlags::BLIT_DST
                | vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR,
        )
    }

    fn max_image_array_layers(&self) -> u32 {
        self.limits.max_image_array_layers
    }

    fn register_texture(&self, view: vk::ImageView) -> u32 {
        let mut table = lock(&self.textures);
        let id = table.ids.alloc();
        let needed = table.ids.high_water_mark() as usize;
        if table.views.len() < needed {
            table.views.resize(needed, vk::ImageView::null());
        }
        table.views[id as usize] = view;
        id
    }

    fn unregister_texture(&self, texture_id: u32) {
        let mut table = lock(&self.textures);
        if table.ids.free(texture_id) {
            table.views[texture_id as usize] = vk::ImageView::null();
        } else {
            gpu_warn!(LOG_SOURCE, "Texture id {} is not registered", texture_id);
        }
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
        let regions = copy_regions_2d(region, mip_level, num_mip_levels, layer, format, image.aspect(), data.len())?;
        self.upload_to_image(image, &regions, data)
    }

    fn image_data_3d(
        &self,
        image: &VulkanImage,
        offset: vk::Offset3D,
        extent: vk::Extent3D,
        format: vk::Format,
        data: &[u8],
    ) -> Result<()> {
        let regions = copy_regions_3d(offset, extent, format, image.aspect(), data.len())?;
        self.upload_to_image(image, &regions, data)
    }

    fn acquire_immediate(&self) -> Result<vk::CommandBuffer> {
        let immediate = lock(&self.immediate);
        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(immediate.pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let cmd = self
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| gpu_err!(LOG_SOURCE, "Failed to allocate immediate command buffer: {:?}", e))?
                [0];

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            if let Err(e) = self.device.begin_command_buffer(cmd, &begin_info) {
                self.device.free_command_buffers(immediate.pool, &[cmd]);
                return Err(gpu_err!(LOG_SOURCE, "Failed to begin immediate command buffer: {:?}", e));
            }

            Ok(cmd)
        }
    }

    fn submit_immediate(&self, cmd: vk::CommandBuffer) -> Result<()> {
        let immediate = lock(&self.immediate);
        unsafe {
            let result = self.submit_and_wait(&immediate, cmd);
            self.device.free_command_buffers(immediate.pool, &[cmd]);
            result
        }
    }

    fn cmd_image_barrier(&self, cmd: vk::CommandBuffer, barrier: &ImageBarrier) {
        let image_barrier = vk::ImageMemoryBarrier::default()
            .old_layout(barrier.old_layout)
            .new_layout(barrier.new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(barrier.image)
            .subresource_range(barrier.range)
            .src_access_mask(barrier.src_access)
            .dst_access_mask(barrier.dst_access);

        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd,
                barrier.src_stage,
                barrier.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[image_barrier],
            );
        }
    }

    fn cmd_blit_image(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        blit: &vk::ImageBlit,
        filter: vk::Filter,
    ) {
        unsafe {
            self.device.cmd_blit_image(
                cmd,
                image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                std::slice::from_ref(blit),
                filter,
            );
        }
    }
}

impl VulkanContext {
    /// End `cmd`, submit it and block on the immediate fence
    unsafe fn submit_and_wait(&self, immediate: &ImmediateCommands, cmd: vk::CommandBuffer) -> Result<()> {
        self.device
            .end_command_buffer(cmd)
            .map_err(|e| gpu_err!(LOG_SOURCE, "Failed to end immediate command buffer: {:?}", e))?;

        let command_buffers = [cmd];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        self.device
            .queue_submit(self.queue, &[submit_info], immediate.fence)
            .map_err(|e| gpu_err!(LOG_SOURCE, "Failed to submit immediate commands: {:?}", e))?;

        self.device
            .wait_for_fences(&[immediate.fence], true, u64::MAX)
            .map_err(|e| gpu_err!(LOG_SOURCE, "Failed to wait for immediate fence: {:?}", e))?;

        self.device
            .reset_fences(&[immediate.fence])
            .map_err(|e| gpu_err!(LOG_SOURCE, "Failed to reset immediate fence: {:?}", e))
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish
            self.device.device_wait_idle().ok();

            // 1. Immediate command pool and fence
            {
                let immediate = self
                    .immediate
                    .get_mut()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                self.device.destroy_fence(immediate.fence, None);
                self.device.destroy_command_pool(immediate.pool, None);
            }

            // 2. Drop allocator: free VkDeviceMemory pages BEFORE destroying device
            ManuallyDrop::drop(&mut self.allocator);

            // 3. Destroy debug messenger BEFORE device and instance
            if let (Some(debug_utils), Some(messenger)) =
                (&self.debug_utils_loader, &self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }

            // 4. Destroy device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
