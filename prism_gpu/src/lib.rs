/*!
# Prism GPU

Core types and traits for the Prism GPU abstraction.

This crate provides the platform-agnostic description of GPU image resources:
texture descriptors, upload ranges, pixel formats and the `Texture` trait that
backend implementations (Vulkan, ...) provide concrete types for.

## Architecture

- **TextureDesc**: Immutable description of a texture's shape, format and usage
- **TextureRangeDesc**: Sub-region of a texture targeted by an upload
- **TextureFormat**: API-agnostic pixel formats (color, compressed, depth/stencil)
- **Texture**: Texture resource trait implemented by backends
- **DeviceConfig**: Configuration consumed by backend device creation

Backends own every native handle; nothing in this crate touches a graphics API.
*/

// Internal modules
mod error;
mod gpu;
pub mod log;
pub mod render;
pub mod utils;

// Main prism namespace module
pub mod prism {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging facade
    pub use crate::gpu::Gpu;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: gpu_* macros are exported at the crate root by #[macro_export]
    }

    // Render sub-module with all texture types
    pub mod render {
        pub use crate::render::*;
    }
}
