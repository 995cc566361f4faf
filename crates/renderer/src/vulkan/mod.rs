//! Vulkan implementations of the scheduler's collaborators.

mod context;
mod presentation;
mod triangle;

pub use context::VulkanContext;
pub use presentation::{SwapchainPresentation, classify_acquire, classify_present};
pub use triangle::TrianglePass;
