//! Unit tests for error.rs
//!
//! Tests all Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_unimplemented_display() {
    let err = Error::Unimplemented("TwoDArray textures".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Unimplemented"));
    assert!(display.contains("TwoDArray textures"));
}

#[test]
fn test_argument_out_of_range_display() {
    let err = Error::ArgumentOutOfRange("10 mip levels for 64x64".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Argument out of range"));
    assert!(display.contains("10 mip levels for 64x64"));
}

#[test]
fn test_invalid_operation_display() {
    let err = Error::InvalidOperation("Cannot create image view".to_string());
    assert_eq!(format!("{}", err), "Invalid operation: Cannot create image view");
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_backend_and_initialization_display() {
    let backend = Error::BackendError("queue submit failed".to_string());
    assert!(format!("{}", backend).contains("Backend error"));

    let init = Error::InitializationFailed("no Vulkan loader".to_string());
    assert!(format!("{}", init).contains("Initialization failed"));
    assert!(format!("{}", init).contains("no Vulkan loader"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_and_eq() {
    let err = Error::ArgumentOutOfRange("x".to_string());
    assert_eq!(err.clone(), err);
    assert_ne!(err, Error::ArgumentOutOfRange("y".to_string()));
    assert_ne!(err, Error::Unimplemented("x".to_string()));
}

#[test]
fn test_error_debug_names_variant() {
    let debug = format!("{:?}", Error::InvalidOperation("v".to_string()));
    assert!(debug.contains("InvalidOperation"));
}

// ============================================================================
// RESULT ALIAS
// ============================================================================

#[test]
fn test_result_question_mark_propagation() {
    fn inner() -> Result<u32> {
        Err(Error::Unimplemented("inner".to_string()))
    }
    fn outer() -> Result<u32> {
        let value = inner()?;
        Ok(value + 1)
    }

    assert_eq!(outer(), Err(Error::Unimplemented("inner".to_string())));
}
