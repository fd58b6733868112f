//! Vulkan backend
//!
//! RAII wrappers over ash plus [`VulkanDevice`], the production
//! [`GraphicsDevice`](crate::render::GraphicsDevice) implementation.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor_set;
pub mod device;
pub mod framebuffer;
pub mod pipeline;
pub mod render_pass;
pub mod swapchain;
pub mod sync;
pub mod uniforms;

use ash::vk;
use thiserror::Error;

pub use context::VulkanContext;
pub use device::VulkanDevice;

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },

    /// Memory allocation failed
    #[error("Out of memory: {requested} bytes")]
    OutOfMemory {
        /// Number of bytes that were requested
        requested: usize,
    },

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// No suitable memory type found for allocation
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,
}

impl VulkanError {
    /// Whether the error means device or host memory ran out
    pub fn is_out_of_memory(&self) -> bool {
        matches!(
            self,
            Self::Api(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY)
                | Self::OutOfMemory { .. }
                | Self::NoSuitableMemoryType
        )
    }
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;
