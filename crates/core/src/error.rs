//! Error types shared by the application layers.

use thiserror::Error;

use crate::config::ConfigError;

/// Top-level error type for non-GPU failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Vulkan-related errors surfaced outside the RHI layer
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// Window creation or event loop errors
    #[error("Window error: {0}")]
    Window(String),

    /// Configuration loading or validation errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using the shared [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
