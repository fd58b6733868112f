//! Rendering errors

use std::path::PathBuf;
use thiserror::Error;

use crate::render::backends::vulkan::VulkanError;

/// Errors raised by graphics devices and the objects that draw through them
#[derive(Error, Debug)]
pub enum RenderError {
    /// Shader file missing, unreadable or rejected by the device
    #[error("shader program from {path} failed: {reason}")]
    ShaderCompile { path: PathBuf, reason: String },

    /// Device memory for geometry could not be obtained
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// A handle that has been released or never existed
    #[error("unknown {kind} handle")]
    UnknownHandle { kind: &'static str },

    /// Uniform or draw issued without a program in use
    #[error("no shader program in use")]
    NoProgramBound,

    /// Draw issued without geometry bound
    #[error("no geometry bound")]
    NoGeometryBound,

    /// Draw issued outside `begin_frame`/`end_frame`
    #[error("no frame is being recorded")]
    NoActiveFrame,

    /// Draw count larger than the bound geometry holds
    #[error("draw of {requested} exceeds {available} uploaded elements")]
    DrawOutOfRange { requested: u32, available: u32 },

    /// More draws than the per-frame uniform ring can hold
    #[error("frame exceeded {limit} draw calls")]
    DrawLimitExceeded { limit: usize },

    /// Point size that is non-finite or not positive
    #[error("invalid point size {0}")]
    InvalidPointSize(f32),

    /// Backend failure
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
