/// Texture - Vulkan implementation of the Texture trait
///
/// Owns the native image, its full-resource view and a lazily filled cache
/// of single-level views for framebuffer attachments. All device work is
/// delegated to the `DeviceContext` the texture was created with.

use ash::vk;
use prism_gpu::prism::render::{
    ResourceStorage, Texture as RenderTexture, TextureCubeFace, TextureDesc, TextureFormat,
    TextureRangeDesc, TextureType, TextureUsage, CUBE_FACE_COUNT,
};
use prism_gpu::prism::{Error, Result};
use prism_gpu::{gpu_debug, gpu_error, gpu_warn};
use std::borrow::Cow;
use std::sync::{Arc, Mutex};

use crate::vulkan_context::{DeviceContext, ImageCreateDesc, ImageViewDesc};
use crate::vulkan_format::{
    aspect_for_format, copy_texel_layout, format_info, sample_count_to_vk, storage_to_memory_flags,
    vk_format_to_texture_format, CopyTexelLayout,
};
use crate::vulkan_image::VulkanImage;
use crate::vulkan_image_view::VulkanImageView;

const LOG_SOURCE: &str = "prism::vulkan::Texture";

/// Vulkan texture implementation
pub struct Texture {
    // Field order is drop order: views go before the image they view.
    /// Single-level views indexed by mip level, created on first request
    framebuffer_views: Mutex<Vec<Option<VulkanImageView>>>,
    /// View over every mip level and layer
    image_view: VulkanImageView,
    /// Native image and memory
    image: VulkanImage,
    /// Descriptor after soft-fail normalization
    desc: TextureDesc,
    /// Id registered with the context
    texture_id: u32,
    ctx: Arc<dyn DeviceContext>,
}

/// Native shape derived from a validated descriptor
struct NativeShape {
    image_type: vk::ImageType,
    view_type: vk::ImageViewType,
    flags: vk::ImageCreateFlags,
    extent: vk::Extent3D,
    array_layers: u32,
}

impl Texture {
    /// Create a texture from a descriptor
    ///
    /// Zero mip levels and empty usage are corrected with a warning; every
    /// other invalid descriptor is rejected before any native call.
    pub fn create(ctx: Arc<dyn DeviceContext>, desc: TextureDesc) -> Result<Self> {
        let desc = validate_desc(desc).map_err(reject)?;

        let info = format_info(desc.format).ok_or_else(|| {
            reject(Error::Unimplemented(format!(
                "Texture format {:?} has no Vulkan equivalent",
                desc.format
            )))
        })?;
        let vk_format = if info.is_depth_or_stencil {
            ctx.closest_depth_stencil_format(desc.format)
        } else {
            info.format
        };

        let shape = native_shape(&desc).map_err(reject)?;
        let max_layers = ctx.max_image_array_layers();
        if shape.array_layers > max_layers {
            return Err(reject(Error::ArgumentOutOfRange(format!(
                "{} native layers requested, the device allows {}",
                shape.array_layers, max_layers
            ))));
        }
        let aspect = aspect_for_format(desc.format);
        let samples = sample_count_to_vk(desc.num_samples).ok_or_else(|| {
            reject(Error::ArgumentOutOfRange(format!(
                "Unsupported sample count {}",
                desc.num_samples
            )))
        })?;

        let image = VulkanImage::create(
            Arc::clone(&ctx),
            &ImageCreateDesc {
                image_type: shape.image_type,
                extent: shape.extent,
                format: vk_format,
                mip_levels: desc.num_mip_levels,
                array_layers: shape.array_layers,
                samples,
                tiling: vk::ImageTiling::OPTIMAL,
                usage: image_usage_flags(&desc),
                memory_flags: storage_to_memory_flags(desc.storage),
                flags: shape.flags,
                debug_name: prefixed_name("Image", &desc.debug_name),
            },
            aspect,
        )?;

        let image_view = image.create_image_view(&ImageViewDesc {
            view_type: shape.view_type,
            format: vk_format,
            aspect,
            base_mip_level: 0,
            level_count: desc.num_mip_levels,
            base_array_layer: 0,
            layer_count: shape.array_layers,
            debug_name: prefixed_name("Image View", &desc.debug_name),
        })?;

        let texture_id = ctx.register_texture(image_view.handle());

        gpu_debug!(
            LOG_SOURCE,
            "Created {:?} texture '{}' {}x{}x{} ({:?}, {} mips, {} native layers, id {})",
            desc.texture_type,
            desc.debug_name,
            desc.width,
            desc.height,
            desc.depth,
            desc.format,
            desc.num_mip_levels,
            shape.array_layers,
            texture_id
        );

        Ok(Self {
            framebuffer_views: Mutex::new(Vec::new()),
            image_view,
            image,
            desc,
            texture_id,
            ctx,
        })
    }

    /// Wrap a swapchain image
    ///
    /// The image stays owned by the swapchain; only the view created here is
    /// destroyed when the texture is dropped.
    pub fn from_swapchain_image(
        ctx: Arc<dyn DeviceContext>,
        image: vk::Image,
        format: vk::Format,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let texture_format = vk_format_to_texture_format(format);
        if texture_format == TextureFormat::Invalid {
            return Err(reject(Error::Unimplemented(format!(
                "Swapchain format {:?} has no texture format equivalent",
                format
            ))));
        }

        let desc = TextureDesc::new_2d(
            texture_format,
            extent.width,
            extent.height,
            TextureUsage::ATTACHMENT,
        )
        .with_debug_name("Swapchain");

        let image = VulkanImage::from_external(
            Arc::clone(&ctx),
            image,
            format,
            extent,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
        );

        let image_view = image.create_image_view(&ImageViewDesc {
            view_type: vk::ImageViewType::TYPE_2D,
            format,
            aspect: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
            debug_name: prefixed_name("Image View", &desc.debug_name),
        })?;

        let texture_id = ctx.register_texture(image_view.handle());

        Ok(Self {
            framebuffer_views: Mutex::new(Vec::new()),
            image_view,
            image,
            desc,
            texture_id,
            ctx,
        })
    }

    // ===== NATIVE ACCESSORS =====

    /// Native format (may be a depth fallback of the requested format)
    pub fn vk_format(&self) -> vk::Format {
        self.image.format()
    }

    pub fn vk_image(&self) -> vk::Image {
        self.image.handle()
    }

    /// Full-resource view
    pub fn vk_image_view(&self) -> vk::ImageView {
        self.image_view.handle()
    }

    pub fn image(&self) -> &VulkanImage {
        &self.image
    }

    /// Single-level, single-layer view of `mip_level` for framebuffer use
    ///
    /// Created on first request and cached for the texture's lifetime.
    pub fn image_view_for_framebuffer(&self, mip_level: u32) -> Result<vk::ImageView> {
        if mip_level >= self.image.mip_levels() {
            return Err(Error::ArgumentOutOfRange(format!(
                "Mip level {} exceeds the texture's {} mip levels",
                mip_level,
                self.image.mip_levels()
            )));
        }

        let mut views = self
            .framebuffer_views
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let index = mip_level as usize;

        if let Some(Some(view)) = views.get(index) {
            return Ok(view.handle());
        }
        if views.len() <= index {
            views.resize_with(index + 1, || None);
        }

        let view_type = if self.desc.texture_type == TextureType::ThreeD {
            vk::ImageViewType::TYPE_3D
        } else {
            vk::ImageViewType::TYPE_2D
        };
        let view = self.image.create_image_view(&ImageViewDesc {
            view_type,
            format: self.image.format(),
            aspect: self.image.aspect(),
            base_mip_level: mip_level,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
            debug_name: prefixed_name("Image View", &self.desc.debug_name),
        })?;

        let handle = view.handle();
        views[index] = Some(view);
        Ok(handle)
    }

    // ===== UPLOAD =====

    /// Copy `range.num_layers` layers starting at native layer `first_layer`
    fn upload_layers(
        &self,
        range: &TextureRangeDesc,
        first_layer: u32,
        data: &[u8],
        bytes_per_row: usize,
    ) -> Result<()> {
        if !self.image.usage().contains(vk::ImageUsageFlags::TRANSFER_DST) {
            return Err(reject(Error::InvalidOperation(
                "Texture was not created as a transfer destination (host-visible storage)"
                    .to_string(),
            )));
        }

        let is_3d = self.desc.texture_type == TextureType::ThreeD;
        if is_3d && (range.mip_level != 0 || range.num_mip_levels != 1) {
            return Err(reject(Error::Unimplemented(
                "3D uploads only target mip level 0".to_string(),
            )));
        }

        // Size by the native format: a depth fallback may differ from the logical one
        let vk_format = self.image.format();
        let texels = copy_texel_layout(vk_format, self.image.aspect()).ok_or_else(|| {
            reject(Error::Unimplemented(format!(
                "Uploads to {:?} ({:?}) are not supported",
                vk_format,
                self.image.aspect()
            )))
        })?;
        let layout = UploadLayout::new(texels, range, bytes_per_row).map_err(reject)?;
        let required = layout.required_len(range.num_layers);
        if data.len() < required {
            return Err(reject(Error::ArgumentOutOfRange(format!(
                "Upload needs {} bytes, got {}",
                required,
                data.len()
            ))));
        }

        for i in 0..range.num_layers {
            let src = &data[layout.src_layer_stride() * i as usize..];
            let layer_data = layout.layer_data(src);

            if is_3d {
                self.ctx.image_data_3d(
                    &self.image,
                    vk::Offset3D {
                        x: range.x as i32,
                        y: range.y as i32,
                        z: range.z as i32,
                    },
                    vk::Extent3D {
                        width: range.width,
                        height: range.height,
                        depth: range.depth,
                    },
                    vk_format,
                    &layer_data,
                )?;
            } else {
                self.ctx.image_data_2d(
                    &self.image,
                    vk::Rect2D {
                        offset: vk::Offset2D {
                            x: range.x as i32,
                            y: range.y as i32,
                        },
                        extent: vk::Extent2D {
                            width: range.width,
                            height: range.height,
                        },
                    },
                    range.mip_level,
                    range.num_mip_levels,
                    first_layer + i,
                    vk_format,
                    &layer_data,
                )?;
            }
        }

        Ok(())
    }
}

impl RenderTexture for Texture {
    fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    fn texture_id(&self) -> u32 {
        self.texture_id
    }

    fn is_swapchain_texture(&self) -> bool {
        self.image.is_externally_managed()
    }

    fn upload(
        &self,
        range: &TextureRangeDesc,
        data: Option<&[u8]>,
        bytes_per_row: usize,
    ) -> Result<()> {
        let Some(data) = data else {
            return Ok(());
        };

        range.validate(&self.desc).map_err(reject)?;
        self.upload_layers(range, range.layer, data, bytes_per_row)
    }

    fn upload_cube_face(
        &self,
        range: &TextureRangeDesc,
        face: TextureCubeFace,
        data: Option<&[u8]>,
        bytes_per_row: usize,
    ) -> Result<()> {
        let Some(data) = data else {
            return Ok(());
        };

        range.validate_cube_face(&self.desc).map_err(reject)?;
        let native_layer = range.layer * CUBE_FACE_COUNT + face.layer_offset();
        self.upload_layers(range, native_layer, data, bytes_per_row)
    }

    fn generate_mipmap(&self) -> Result<()> {
        if self.image.mip_levels() <= 1 {
            return Ok(());
        }

        let transfer = vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST;
        if !self.image.usage().contains(transfer) {
            return Err(reject(Error::InvalidOperation(
                "Mipmap generation needs a transfer source and destination image".to_string(),
            )));
        }
        if self.image.layout() == vk::ImageLayout::UNDEFINED {
            return Err(reject(Error::InvalidOperation(
                "Mipmap generation requires data in mip level 0".to_string(),
            )));
        }

        let cmd = self.ctx.acquire_immediate()?;
        self.image.record_mipmap_generation(cmd);
        self.ctx.submit_immediate(cmd)
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.ctx.unregister_texture(self.texture_id);
    }
}

// ============================================================================
// Creation helpers
// ============================================================================

fn reject(error: Error) -> Error {
    gpu_error!(LOG_SOURCE, "{}", error);
    error
}

fn prefixed_name(prefix: &str, name: &str) -> String {
    if name.is_empty() {
        String::new()
    } else {
        format!("{}: {}", prefix, name)
    }
}

/// Validate a descriptor, correcting the two soft failures
fn validate_desc(mut desc: TextureDesc) -> Result<TextureDesc> {
    match desc.texture_type {
        TextureType::TwoD | TextureType::ThreeD | TextureType::Cube => {}
        TextureType::TwoDArray => {
            return Err(Error::Unimplemented(
                "TwoDArray textures are not supported; use TwoD with num_layers > 1".to_string(),
            ));
        }
    }

    if desc.num_mip_levels == 0 {
        gpu_warn!(
            LOG_SOURCE,
            "Texture '{}' requested 0 mip levels, using 1",
            desc.debug_name
        );
        desc.num_mip_levels = 1;
    }

    if desc.num_samples > 1 && desc.num_mip_levels > 1 {
        return Err(Error::ArgumentOutOfRange(format!(
            "Multisampled textures cannot have mip levels (samples {}, mips {})",
            desc.num_samples, desc.num_mip_levels
        )));
    }

    if desc.num_samples > 1 && desc.texture_type == TextureType::ThreeD {
        return Err(Error::ArgumentOutOfRange(
            "3D textures cannot be multisampled".to_string(),
        ));
    }

    let max_mip_levels = TextureDesc::calc_num_mip_levels(desc.width, desc.height);
    if desc.num_mip_levels > max_mip_levels {
        return Err(Error::ArgumentOutOfRange(format!(
            "{} mip levels requested, a {}x{} texture has at most {}",
            desc.num_mip_levels, desc.width, desc.height, max_mip_levels
        )));
    }

    if desc.usage.is_empty() {
        gpu_warn!(
            LOG_SOURCE,
            "Texture '{}' has no usage flags, defaulting to SAMPLED",
            desc.debug_name
        );
        desc.usage = TextureUsage::SAMPLED;
    }

    validate_native_limits(&desc)?;
    Ok(desc)
}

/// Shape checks Vulkan would otherwise reject at image creation
fn validate_native_limits(desc: &TextureDesc) -> Result<()> {
    if desc.width == 0 || desc.height == 0 || desc.depth == 0 {
        return Err(Error::ArgumentOutOfRange(format!(
            "Texture extent {}x{}x{} is empty",
            desc.width, desc.height, desc.depth
        )));
    }
    if desc.num_layers == 0 {
        return Err(Error::ArgumentOutOfRange(
            "Texture must have at least one layer".to_string(),
        ));
    }

    match desc.texture_type {
        TextureType::TwoD | TextureType::TwoDArray | TextureType::Cube if desc.depth != 1 => {
            return Err(Error::ArgumentOutOfRange(format!(
                "{:?} textures must have depth 1, got {}",
                desc.texture_type, desc.depth
            )));
        }
        TextureType::Cube if desc.width != desc.height => {
            return Err(Error::ArgumentOutOfRange(format!(
                "Cube faces must be square, got {}x{}",
                desc.width, desc.height
            )));
        }
        TextureType::ThreeD if desc.num_layers > 1 => {
            return Err(Error::ArgumentOutOfRange(
                "3D textures cannot have array layers".to_string(),
            ));
        }
        TextureType::Cube if desc.num_layers.checked_mul(CUBE_FACE_COUNT).is_none() => {
            return Err(Error::ArgumentOutOfRange(format!(
                "{} cube layers exceed the native layer range",
                desc.num_layers
            )));
        }
        _ => {}
    }

    if sample_count_to_vk(desc.num_samples).is_none() {
        return Err(Error::ArgumentOutOfRange(format!(
            "Unsupported sample count {}",
            desc.num_samples
        )));
    }
    if desc.num_samples > 1 && desc.texture_type == TextureType::Cube {
        return Err(Error::ArgumentOutOfRange(
            "Cube textures cannot be multisampled".to_string(),
        ));
    }
    if desc.num_samples > 1 && desc.usage.contains(TextureUsage::STORAGE) {
        return Err(Error::ArgumentOutOfRange(
            "Storage textures cannot be multisampled".to_string(),
        ));
    }

    Ok(())
}

/// Native usage flags for a validated descriptor
fn image_usage_flags(desc: &TextureDesc) -> vk::ImageUsageFlags {
    let mut usage = vk::ImageUsageFlags::TRANSFER_SRC;

    if desc.storage == ResourceStorage::DevicePrivate {
        usage |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    if desc.usage.contains(TextureUsage::SAMPLED) {
        usage |= vk::ImageUsageFlags::SAMPLED;
    }
    if desc.usage.contains(TextureUsage::STORAGE) {
        usage |= vk::ImageUsageFlags::STORAGE;
    }
    if desc.usage.contains(TextureUsage::ATTACHMENT) {
        usage |= if desc.format.is_depth_or_stencil() {
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
        } else {
            vk::ImageUsageFlags::COLOR_ATTACHMENT
        };
    }

    usage
}

fn native_shape(desc: &TextureDesc) -> Result<NativeShape> {
    let flat_extent = vk::Extent3D {
        width: desc.width,
        height: desc.height,
        depth: 1,
    };

    let shape = match desc.texture_type {
        TextureType::TwoD => NativeShape {
            image_type: vk::ImageType::TYPE_2D,
            view_type: if desc.num_layers > 1 {
                vk::ImageViewType::TYPE_2D_ARRAY
            } else {
                vk::ImageViewType::TYPE_2D
            },
            flags: vk::ImageCreateFlags::empty(),
            extent: flat_extent,
            array_layers: desc.num_layers,
        },
        TextureType::ThreeD => NativeShape {
            image_type: vk::ImageType::TYPE_3D,
            view_type: vk::ImageViewType::TYPE_3D,
            flags: vk::ImageCreateFlags::empty(),
            extent: vk::Extent3D {
                depth: desc.depth,
                ..flat_extent
            },
            array_layers: 1,
        },
        TextureType::Cube => NativeShape {
            image_type: vk::ImageType::TYPE_2D,
            view_type: if desc.num_layers > 1 {
                vk::ImageViewType::CUBE_ARRAY
            } else {
                vk::ImageViewType::CUBE
            },
            flags: vk::ImageCreateFlags::CUBE_COMPATIBLE,
            extent: flat_extent,
            array_layers: desc.native_layer_count(),
        },
        TextureType::TwoDArray => {
            return Err(Error::Unimplemented(
                "TwoDArray textures are not supported".to_string(),
            ));
        }
    };

    Ok(shape)
}

// ============================================================================
// Upload layout
// ============================================================================

/// Byte layout of one upload: source pitch vs. tightly packed destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UploadLayout {
    /// Tightly packed row size (block row for compressed formats)
    tight_row: usize,
    /// Source row pitch
    src_row: usize,
    /// Rows per layer (`height * depth`)
    rows: usize,
    /// Tightly packed bytes per layer, summed over all uploaded mip levels
    layer_size: usize,
}

impl UploadLayout {
    fn new(texels: CopyTexelLayout, range: &TextureRangeDesc, bytes_per_row: usize) -> Result<Self> {
        let tight_row = texels.bytes_per_row(range.width);
        let layer_size = (0..range.num_mip_levels)
            .map(|i| texels.bytes_per_slice(range.width, range.height, range.depth, i))
            .sum();

        // Compressed data is always consumed as tightly packed blocks
        let src_row = if bytes_per_row == 0 || texels.is_compressed() {
            tight_row
        } else {
            bytes_per_row
        };

        if src_row < tight_row {
            return Err(Error::ArgumentOutOfRange(format!(
                "Row pitch {} is smaller than a packed row of {} bytes",
                src_row, tight_row
            )));
        }
        if src_row != tight_row && range.num_mip_levels > 1 {
            return Err(Error::ArgumentOutOfRange(
                "Padded rows are only supported for single mip level uploads".to_string(),
            ));
        }

        Ok(Self {
            tight_row,
            src_row,
            rows: range.height as usize * range.depth as usize,
            layer_size,
        })
    }

    fn needs_repack(&self) -> bool {
        self.src_row != self.tight_row
    }

    /// Distance between consecutive layers in the source data
    fn src_layer_stride(&self) -> usize {
        if self.needs_repack() {
            self.src_row * self.rows
        } else {
            self.layer_size
        }
    }

    /// Minimum source length for `num_layers` layers
    ///
    /// The padding after the last row of the last layer is not required.
    fn required_len(&self, num_layers: u32) -> usize {
        let last_layer = if self.needs_repack() {
            self.src_row * (self.rows - 1) + self.tight_row
        } else {
            self.layer_size
        };
        self.src_layer_stride() * (num_layers as usize - 1) + last_layer
    }

    /// Tightly packed bytes of the layer starting at `src`
    ///
    /// Borrows `src` unless rows have to be repacked.
    fn layer_data<'a>(&self, src: &'a [u8]) -> Cow<'a, [u8]> {
        if !self.needs_repack() {
            return Cow::Borrowed(&src[..self.layer_size]);
        }

        let mut packed = Vec::with_capacity(self.layer_size);
        for row in src.chunks(self.src_row).take(self.rows) {
            packed.extend_from_slice(&row[..self.tight_row]);
        }
        Cow::Owned(packed)
    }
}

#[cfg(test)]
#[path = "vulkan_texture_tests.rs"]
mod tests;
