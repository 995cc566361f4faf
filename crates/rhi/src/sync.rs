//! Synchronization primitives for Vulkan.
//!
//! - [`Semaphore`]: GPU-to-GPU ordering between queue operations
//! - [`Fence`]: GPU-to-CPU completion signal the host can wait on
//!
//! # Overview
//!
//! A frame touches both kinds:
//!
//! - **Semaphores** order work on the GPU timeline. The acquire signals one
//!   that the submission waits on, and the submission signals another that
//!   presentation waits on. The host never observes them.
//!
//! - **Fences** report completion back to the host. Waiting on a frame's
//!   fence is the only point where the CPU learns that the GPU has finished
//!   with that frame's command buffer and semaphores.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vkframe_rhi::device::Device;
//! use vkframe_rhi::sync::{Fence, Semaphore};
//!
//! # fn example(device: Arc<Device>) -> Result<(), vkframe_rhi::RhiError> {
//! let image_acquired = Semaphore::new(device.clone())?;
//!
//! // Signaled, so the first wait returns immediately
//! let frame_complete = Fence::new(device.clone(), true)?;
//!
//! frame_complete.wait(u64::MAX)?;
//! frame_complete.reset()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan semaphore wrapper.
///
/// Each frame slot owns two:
/// - image acquired: signaled by the presentation engine, waited on by the submission
/// - render finished: signaled by the submission, waited on by presentation
///
/// Created unsignaled. Destroyed on drop, so it must not be referenced by
/// pending GPU work at that point.
///
/// # Thread Safety
///
/// The handle never changes after creation. Queue operations that use it are
/// synchronized by the queue, not by this type.
pub struct Semaphore {
    /// Keeps the device alive until the semaphore is destroyed.
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Creates a new unsignaled semaphore.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device that owns the semaphore
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use vkframe_rhi::device::Device;
    /// use vkframe_rhi::sync::Semaphore;
    ///
    /// # fn example(device: Arc<Device>) -> Result<(), vkframe_rhi::RhiError> {
    /// let render_finished = Semaphore::new(device)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();

        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        debug!("Created semaphore");

        Ok(Self { device, semaphore })
    }

    /// Returns the raw handle for use in submit and present infos.
    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
        debug!("Destroyed semaphore");
    }
}

/// Vulkan fence wrapper.
///
/// The frame scheduler gives each slot one fence. The slot's submission
/// signals it, and the next tick on that slot waits for it before touching
/// anything the submission used.
///
/// # Thread Safety
///
/// Wait and reset may be called from any thread. A fence must not be reset
/// while a pending submission will signal it.
pub struct Fence {
    /// Keeps the device alive until the fence is destroyed.
    device: Arc<Device>,
    fence: vk::Fence,
}

impl Fence {
    /// Creates a new fence.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device that owns the fence
    /// * `signaled` - Create the fence already signaled. Use this for fences
    ///   that are waited on before any work that signals them was submitted.
    ///
    /// # Errors
    ///
    /// Returns an error if fence creation fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use vkframe_rhi::device::Device;
    /// use vkframe_rhi::sync::Fence;
    ///
    /// # fn example(device: Arc<Device>) -> Result<(), vkframe_rhi::RhiError> {
    /// // A fresh frame slot has nothing in flight yet
    /// let frame_complete = Fence::new(device, true)?;
    /// frame_complete.wait(u64::MAX)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(device: Arc<Device>, signaled: bool) -> RhiResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::default().flags(flags);

        let fence = unsafe { device.handle().create_fence(&create_info, None)? };

        debug!(
            "Created fence ({})",
            if signaled { "signaled" } else { "unsignaled" }
        );

        Ok(Self { device, fence })
    }

    /// Returns the raw handle for use in submit infos.
    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Blocks until the fence is signaled or `timeout` nanoseconds pass.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Nanoseconds to wait; `u64::MAX` waits without bound
    ///
    /// # Errors
    ///
    /// Returns `vk::Result::TIMEOUT` as an error if the timeout expires, and
    /// `ERROR_DEVICE_LOST` if the device stopped executing.
    pub fn wait(&self, timeout: u64) -> RhiResult<()> {
        let fences = [self.fence];
        unsafe {
            self.device
                .handle()
                .wait_for_fences(&fences, true, timeout)?
        };
        Ok(())
    }

    /// Returns the fence to the unsignaled state.
    ///
    /// Only call this once the fence has been observed signaled and before
    /// the submission that will signal it again.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset fails.
    pub fn reset(&self) -> RhiResult<()> {
        let fences = [self.fence];
        unsafe { self.device.handle().reset_fences(&fences)? };
        Ok(())
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
        debug!("Destroyed fence");
    }
}
