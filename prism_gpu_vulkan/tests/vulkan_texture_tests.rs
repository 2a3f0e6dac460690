//! Integration tests for Vulkan textures on a real device
//!
//! All tests require a GPU and are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_texture_tests -- --ignored

use ash::vk;
use prism_gpu::prism::render::{
    DeviceConfig, ResourceStorage, Texture, TextureCubeFace, TextureDesc, TextureFormat,
    TextureRangeDesc, TextureType, TextureUsage,
};
use prism_gpu::prism::Error;
use prism_gpu_vulkan::prism::{DeviceContext, VulkanContext, VulkanTexture};
use std::sync::Arc;

/// Headless context without validation noise
fn create_context() -> Arc<VulkanContext> {
    let config = DeviceConfig {
        enable_validation: false,
        app_name: "Prism Texture Tests".to_string(),
        ..DeviceConfig::default()
    };
    VulkanContext::new(&config).unwrap()
}

fn create_texture(context: &Arc<VulkanContext>, desc: TextureDesc) -> prism_gpu::prism::Result<VulkanTexture> {
    let ctx: Arc<dyn DeviceContext> = context.clone();
    VulkanTexture::create(ctx, desc)
}

// ============================================================================
// CREATION
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_create_sampled_2d_texture() {
    let context = create_context();
    let desc = TextureDesc::new_2d(TextureFormat::R8G8B8A8_UNORM, 256, 256, TextureUsage::SAMPLED)
        .with_debug_name("albedo");

    let texture = create_texture(&context, desc).unwrap();

    assert_eq!(texture.dimensions().width, 256);
    assert_eq!(texture.format(), TextureFormat::R8G8B8A8_UNORM);
    assert_eq!(texture.vk_format(), vk::Format::R8G8B8A8_UNORM);
    assert_ne!(texture.vk_image(), vk::Image::null());
    assert_ne!(texture.texture_id(), 0);
    assert_eq!(context.texture_view(texture.texture_id()), Some(texture.vk_image_view()));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_texture_ids_are_released() {
    let context = create_context();
    let before = context.texture_count();

    let texture = create_texture(
        &context,
        TextureDesc::new_2d(TextureFormat::R8_UNORM, 16, 16, TextureUsage::SAMPLED),
    )
    .unwrap();
    let id = texture.texture_id();
    assert_eq!(context.texture_count(), before + 1);

    drop(texture);
    assert_eq!(context.texture_count(), before);
    assert_eq!(context.texture_view(id), None);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_create_cube_texture() {
    let context = create_context();
    let desc = TextureDesc::new_cube(TextureFormat::R8G8B8A8_UNORM, 64, 64, TextureUsage::SAMPLED);

    let texture = create_texture(&context, desc).unwrap();

    assert_eq!(texture.texture_type(), TextureType::Cube);
    assert_eq!(texture.image().array_layers(), 6);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_create_3d_texture() {
    let context = create_context();
    let desc = TextureDesc::new_3d(TextureFormat::R8_UNORM, 32, 32, 8, TextureUsage::SAMPLED);

    let texture = create_texture(&context, desc).unwrap();

    assert_eq!(texture.image().extent().depth, 8);
    assert_eq!(texture.image().array_layers(), 1);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_depth_attachment_gets_supported_format() {
    let context = create_context();
    let desc = TextureDesc::new_2d(TextureFormat::D24_UNORM_S8_UINT, 128, 128, TextureUsage::ATTACHMENT);

    let texture = create_texture(&context, desc).unwrap();

    // Either the exact format or a wider depth fallback
    assert!(matches!(
        texture.vk_format(),
        vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT
    ));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_multisampled_attachment() {
    let context = create_context();
    let desc = TextureDesc::new_2d(TextureFormat::R8G8B8A8_UNORM, 64, 64, TextureUsage::ATTACHMENT)
        .with_samples(4);

    let texture = create_texture(&context, desc).unwrap();
    assert_eq!(texture.image().samples(), vk::SampleCountFlags::TYPE_4);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_create_rejects_zero_extent() {
    let context = create_context();
    let desc = TextureDesc::new_2d(TextureFormat::R8G8B8A8_UNORM, 0, 64, TextureUsage::SAMPLED);

    assert!(matches!(create_texture(&context, desc), Err(Error::ArgumentOutOfRange(_))));
}

// ============================================================================
// UPLOAD
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_upload_full_texture() {
    let context = create_context();
    let texture = create_texture(
        &context,
        TextureDesc::new_2d(TextureFormat::R8G8B8A8_UNORM, 4, 4, TextureUsage::SAMPLED),
    )
    .unwrap();
    let data: Vec<u8> = (0..64).collect();

    texture.upload(&texture.full_range(), Some(&data), 0).unwrap();

    assert_eq!(texture.image().layout(), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_upload_padded_rows() {
    let context = create_context();
    let texture = create_texture(
        &context,
        TextureDesc::new_2d(TextureFormat::R8_UNORM, 3, 2, TextureUsage::SAMPLED),
    )
    .unwrap();
    // 3 bytes of pixels per 4-byte row
    let data = [1u8, 2, 3, 0, 4, 5, 6, 0];

    texture.upload(&texture.full_range(), Some(&data), 4).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_upload_mip_chain() {
    let context = create_context();
    let texture = create_texture(
        &context,
        TextureDesc::new_2d(TextureFormat::R8G8B8A8_UNORM, 8, 8, TextureUsage::SAMPLED).with_mip_levels(4),
    )
    .unwrap();
    let data = vec![0x7fu8; 256 + 64 + 16 + 4];
    let range = TextureRangeDesc::new_2d(0, 0, 8, 8).with_mip_levels(0, 4);

    texture.upload(&range, Some(&data), 0).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_upload_3d_volume() {
    let context = create_context();
    let texture = create_texture(
        &context,
        TextureDesc::new_3d(TextureFormat::R8_UNORM, 4, 4, 4, TextureUsage::SAMPLED),
    )
    .unwrap();
    let data = vec![0xffu8; 64];

    texture.upload(&texture.full_range(), Some(&data), 0).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_upload_every_cube_face() {
    let context = create_context();
    let texture = create_texture(
        &context,
        TextureDesc::new_cube(TextureFormat::R8G8B8A8_UNORM, 2, 2, TextureUsage::SAMPLED),
    )
    .unwrap();
    let range = TextureRangeDesc::new_2d(0, 0, 2, 2);

    for (i, face) in [
        TextureCubeFace::PosX,
        TextureCubeFace::NegX,
        TextureCubeFace::PosY,
        TextureCubeFace::NegY,
        TextureCubeFace::PosZ,
        TextureCubeFace::NegZ,
    ]
    .into_iter()
    .enumerate()
    {
        let data = vec![i as u8; 16];
        texture.upload_cube_face(&range, face, Some(&data), 0).unwrap();
    }
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_upload_to_host_visible_is_rejected() {
    let context = create_context();
    let desc = TextureDesc::new_2d(TextureFormat::R8G8B8A8_UNORM, 4, 4, TextureUsage::SAMPLED)
        .with_storage(ResourceStorage::HostVisible);

    match create_texture(&context, desc) {
        Ok(texture) => {
            let data = vec![0u8; 64];
            let result = texture.upload(&texture.full_range(), Some(&data), 0);
            assert!(matches!(result, Err(Error::InvalidOperation(_))));
        }
        // Some drivers cannot place optimal-tiled images in host-visible memory
        Err(e) => assert!(matches!(e, Error::OutOfMemory | Error::BackendError(_))),
    }
}

// ============================================================================
// MIPMAPS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_generate_mipmap_after_upload() {
    let context = create_context();
    let texture = create_texture(
        &context,
        TextureDesc::new_2d(TextureFormat::R8G8B8A8_UNORM, 64, 64, TextureUsage::SAMPLED)
            .with_mip_levels(TextureDesc::calc_num_mip_levels(64, 64)),
    )
    .unwrap();
    let data = vec![0x40u8; 64 * 64 * 4];

    texture.upload(&texture.full_range(), Some(&data), 0).unwrap();
    texture.generate_mipmap().unwrap();

    assert_eq!(texture.num_mip_levels(), 7);
    assert_eq!(texture.image().layout(), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_generate_mipmap_before_upload_fails() {
    let context = create_context();
    let texture = create_texture(
        &context,
        TextureDesc::new_2d(TextureFormat::R8G8B8A8_UNORM, 16, 16, TextureUsage::SAMPLED).with_mip_levels(5),
    )
    .unwrap();

    assert!(matches!(texture.generate_mipmap(), Err(Error::InvalidOperation(_))));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_framebuffer_views_per_level() {
    let context = create_context();
    let texture = create_texture(
        &context,
        TextureDesc::new_2d(TextureFormat::R8G8B8A8_UNORM, 32, 32, TextureUsage::ATTACHMENT).with_mip_levels(3),
    )
    .unwrap();

    let level0 = texture.image_view_for_framebuffer(0).unwrap();
    let level2 = texture.image_view_for_framebuffer(2).unwrap();

    assert_ne!(level0, level2);
    assert_eq!(texture.image_view_for_framebuffer(0).unwrap(), level0);
    assert!(texture.image_view_for_framebuffer(3).is_err());
}
