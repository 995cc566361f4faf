//! Frame scheduling and presentation.
//!
//! This crate provides:
//! - [`FrameScheduler`], the frames-in-flight acquire/submit/present loop
//! - The collaborator traits it drives ([`ExecutionContext`],
//!   [`PresentationSurface`], [`CommandRecorder`])
//! - Vulkan implementations of those collaborators in [`vulkan`]
//! - [`Renderer`], the scheduler assembled for a window

pub mod backend;
mod error;
pub mod frame_scheduler;
pub mod frame_slot;
mod renderer;
pub mod vulkan;

pub use backend::{
    AcquireOutcome, CommandRecorder, ExecutionContext, FrameInfo, PresentOutcome,
    PresentationSurface, Submission,
};
pub use error::{FrameError, FrameResult, FrameStage};
pub use frame_scheduler::{FrameOutcome, FrameScheduler, RecreateOutcome};
pub use frame_slot::FrameSlot;
pub use renderer::{Renderer, VulkanScheduler};
