//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! Safe RAII wrappers over the `ash` bindings. Every Vulkan object created
//! here is released by its wrapper's `Drop`, and every wrapper holds an
//! `Arc<Device>` so the device outlives the objects created from it.
//!
//! It handles:
//! - Instance creation and validation diagnostics
//! - Physical/logical device selection
//! - Swapchain management
//! - Render pass and framebuffers
//! - Command pools and command buffer recording
//! - Shader modules and the graphics pipeline
//! - Synchronization primitives

mod error;

pub mod command;
pub mod device;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;

pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::vk;
