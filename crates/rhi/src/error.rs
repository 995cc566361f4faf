//! RHI-specific error types.

use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] ash::vk::Result),

    /// Failed to load Vulkan
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// No GPU satisfies the presentation requirements
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// Shader module could not be loaded or created
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Surface query or creation failed
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Swapchain creation or image query failed
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;
