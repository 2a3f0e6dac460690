//! Error types for the Prism GPU layer
//!
//! This module defines the error types used throughout the crate family,
//! covering descriptor validation, native resource creation and device setup.

use std::fmt;

/// Result type for Prism operations
pub type Result<T> = std::result::Result<T, Error>;

/// Prism errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unsupported texture kind, format or feature
    Unimplemented(String),

    /// A descriptor or range violates a hard numeric constraint
    ArgumentOutOfRange(String),

    /// Native allocation or view creation failed for reasons outside caller control
    InvalidOperation(String),

    /// Backend-specific error (Vulkan call failure, submission failure, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Initialization failed (instance, device, allocator)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unimplemented(msg) => write!(f, "Unimplemented: {}", msg),
            Error::ArgumentOutOfRange(msg) => write!(f, "Argument out of range: {}", msg),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
