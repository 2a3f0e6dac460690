/// Render module - all texture-related types and traits

// Module declarations
pub mod config;
pub mod texture;
pub mod texture_format;
pub mod texture_range;

// Re-export everything
pub use config::*;
pub use texture::*;
pub use texture_format::*;
pub use texture_range::*;
