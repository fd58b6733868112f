//! Graphics device implementations

/// Records device calls instead of touching a GPU
pub mod headless;

/// Vulkan rendering backend implementation
pub mod vulkan;
