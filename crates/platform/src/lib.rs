//! Platform layer: windowing and surface creation.
//!
//! This crate provides:
//! - A pumped winit event loop owning one window ([`WindowHost`])
//! - Vulkan surface creation via ash-window
//! - The [`ExtentSource`] view of the window used during surface recreation

mod extent;
mod host;
mod window;

pub use extent::{ExtentSource, SurfaceExtent};
pub use host::{WindowEvents, WindowHost};
pub use window::{Surface, Window};
