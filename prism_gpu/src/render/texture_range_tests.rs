//! Unit tests for upload range validation

use crate::error::Error;
use crate::render::{TextureDesc, TextureFormat, TextureRangeDesc, TextureUsage};

fn desc_2d(width: u32, height: u32) -> TextureDesc {
    TextureDesc::new_2d(TextureFormat::R8G8B8A8_UNORM, width, height, TextureUsage::SAMPLED)
}

fn is_out_of_range(result: crate::error::Result<()>) -> bool {
    matches!(result, Err(Error::ArgumentOutOfRange(_)))
}

#[test]
fn test_full_extent_is_valid() {
    let desc = desc_2d(256, 256);
    assert!(TextureRangeDesc::new_2d(0, 0, 256, 256).validate(&desc).is_ok());
}

#[test]
fn test_region_past_edge_is_rejected() {
    let desc = desc_2d(256, 256);
    assert!(is_out_of_range(TextureRangeDesc::new_2d(1, 0, 256, 256).validate(&desc)));
    assert!(is_out_of_range(TextureRangeDesc::new_2d(0, 200, 16, 57).validate(&desc)));
}

#[test]
fn test_offsets_do_not_overflow() {
    let desc = desc_2d(256, 256);
    let range = TextureRangeDesc::new_2d(u32::MAX, 0, 2, 1);
    assert!(is_out_of_range(range.validate(&desc)));
}

#[test]
fn test_empty_extent_is_rejected() {
    let desc = desc_2d(16, 16);
    assert!(is_out_of_range(TextureRangeDesc::new_2d(0, 0, 0, 16).validate(&desc)));
    let no_layers = TextureRangeDesc::new_2d(0, 0, 16, 16).with_layers(0, 0);
    assert!(is_out_of_range(no_layers.validate(&desc)));
}

#[test]
fn test_extent_is_checked_against_mip_level() {
    let desc = desc_2d(256, 256).with_mip_levels(4);
    let level2 = TextureRangeDesc::new_2d(0, 0, 64, 64).with_mip_levels(2, 1);
    assert!(level2.validate(&desc).is_ok());

    let too_big = TextureRangeDesc::new_2d(0, 0, 128, 128).with_mip_levels(2, 1);
    assert!(is_out_of_range(too_big.validate(&desc)));
}

#[test]
fn test_mip_range_bound() {
    let desc = desc_2d(256, 256).with_mip_levels(4);
    let all = TextureRangeDesc::new_2d(0, 0, 256, 256).with_mip_levels(0, 4);
    assert!(all.validate(&desc).is_ok());

    let past = TextureRangeDesc::new_2d(0, 0, 32, 32).with_mip_levels(3, 2);
    assert!(is_out_of_range(past.validate(&desc)));
}

#[test]
fn test_layer_range_bound_uses_native_layers_for_cubes() {
    let cube = TextureDesc::new_cube(TextureFormat::R8G8B8A8_UNORM, 32, 32, TextureUsage::SAMPLED);

    let all_faces = TextureRangeDesc::new_2d(0, 0, 32, 32).with_layers(0, 6);
    assert!(all_faces.validate(&cube).is_ok());

    let past = TextureRangeDesc::new_2d(0, 0, 32, 32).with_layers(5, 2);
    assert!(is_out_of_range(past.validate(&cube)));
}

#[test]
fn test_cube_face_range_addresses_cubes() {
    let cube = TextureDesc::new_cube(TextureFormat::R8G8B8A8_UNORM, 32, 32, TextureUsage::SAMPLED)
        .with_layers(2);

    let second_cube = TextureRangeDesc::new_2d(0, 0, 32, 32).with_layers(1, 1);
    assert!(second_cube.validate_cube_face(&cube).is_ok());

    let third_cube = TextureRangeDesc::new_2d(0, 0, 32, 32).with_layers(2, 1);
    assert!(is_out_of_range(third_cube.validate_cube_face(&cube)));

    let two_layers = TextureRangeDesc::new_2d(0, 0, 32, 32).with_layers(0, 2);
    assert!(is_out_of_range(two_layers.validate_cube_face(&cube)));
}

#[test]
fn test_cube_face_range_requires_cube_texture() {
    let desc = desc_2d(32, 32);
    let range = TextureRangeDesc::new_2d(0, 0, 32, 32);
    assert!(matches!(range.validate_cube_face(&desc), Err(Error::InvalidOperation(_))));
}

#[test]
fn test_3d_depth_bound() {
    let desc = TextureDesc::new_3d(TextureFormat::R8_UNORM, 16, 16, 8, TextureUsage::SAMPLED);
    assert!(TextureRangeDesc::new_3d(0, 0, 4, 16, 16, 4).validate(&desc).is_ok());
    assert!(is_out_of_range(TextureRangeDesc::new_3d(0, 0, 5, 16, 16, 4).validate(&desc)));
}
