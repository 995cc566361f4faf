//! Instance, surface and logical device bundle.

use std::mem::ManuallyDrop;
use std::sync::Arc;

use ash::vk;
use tracing::{error, info, warn};

use vkframe_platform::{Surface, Window};
use vkframe_rhi::command::{CommandBuffer, CommandPool};
use vkframe_rhi::device::Device;
use vkframe_rhi::instance::Instance;
use vkframe_rhi::physical_device::select_physical_device;
use vkframe_rhi::sync::{Fence, Semaphore};
use vkframe_rhi::{RhiError, RhiResult};

use crate::backend::{ExecutionContext, Submission};

/// Owns the Vulkan instance, the window surface and the logical device.
///
/// # Resource Destruction Order
///
/// 1. Wait for the device to go idle
/// 2. Destroy the device
/// 3. Destroy the surface
/// 4. Destroy the instance
///
/// Objects created through this context hold `Arc<Device>` clones and must
/// be dropped first. Everything that clones the device (scheduler,
/// presentation, triangle pipeline) also holds an `Arc<VulkanContext>`, so
/// this drop only runs after all of them are gone.
pub struct VulkanContext {
    instance: ManuallyDrop<Instance>,
    surface: ManuallyDrop<Surface>,
    device: ManuallyDrop<Arc<Device>>,
}

impl VulkanContext {
    /// Brings up Vulkan for `window`.
    ///
    /// # Errors
    ///
    /// Fails if the Vulkan loader is missing, no device can present to the
    /// window, or any creation call fails.
    pub fn new(window: &Window, enable_validation: bool) -> RhiResult<Self> {
        let extensions = window
            .required_extensions()
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let instance = Instance::new(c"vkframe", enable_validation, extensions)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;

        let device = Device::new(&instance, &physical_device_info)?;

        info!(
            "Vulkan context ready on {} (validation: {})",
            physical_device_info.device_name(),
            instance.has_validation()
        );

        Ok(Self {
            instance: ManuallyDrop::new(instance),
            surface: ManuallyDrop::new(surface),
            device: ManuallyDrop::new(device),
        })
    }

    #[inline]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Crate-private so every `Arc<Device>` clone lives in an object that
    /// also holds the context.
    #[inline]
    pub(crate) fn device(&self) -> &Arc<Device> {
        &self.device
    }

    #[inline]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }
}

impl ExecutionContext for VulkanContext {
    type Semaphore = Semaphore;
    type Fence = Fence;
    type CommandPool = CommandPool;
    type CommandBuffer = CommandBuffer;
    type Queue = vk::Queue;

    fn create_semaphore(&self) -> RhiResult<Semaphore> {
        Semaphore::new(Arc::clone(self.device()))
    }

    fn create_fence(&self, signaled: bool) -> RhiResult<Fence> {
        Fence::new(Arc::clone(self.device()), signaled)
    }

    fn create_command_pool(&self) -> RhiResult<CommandPool> {
        CommandPool::new(Arc::clone(self.device()), self.device.graphics_family())
    }

    fn allocate_command_buffers(
        &self,
        pool: &CommandPool,
        count: usize,
    ) -> RhiResult<Vec<CommandBuffer>> {
        let count = u32::try_from(count).map_err(|_| {
            RhiError::SwapchainError(format!("{} command buffers requested", count))
        })?;
        pool.allocate_command_buffers(count)
    }

    fn free_command_buffers(&self, pool: &CommandPool, buffers: Vec<CommandBuffer>) {
        pool.free_command_buffers(buffers);
    }

    fn wait_for_fence(&self, fence: &Fence, timeout: u64) -> RhiResult<()> {
        fence.wait(timeout)
    }

    fn reset_fence(&self, fence: &Fence) -> RhiResult<()> {
        fence.reset()
    }

    fn reset_command_buffer(&self, buffer: &CommandBuffer) -> RhiResult<()> {
        buffer.reset()
    }

    fn submit(&self, queue: vk::Queue, submission: Submission<'_, Self>) -> RhiResult<()> {
        let wait_semaphores = [submission.wait.handle()];
        let wait_stages = [submission.wait_stage];
        let command_buffers = [submission.command_buffer.handle()];
        let signal_semaphores = [submission.signal.handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        // SAFETY: every handle is owned by a live wrapper borrowed for this
        // call, and the scheduler waited out the command buffer's previous use.
        unsafe {
            self.device
                .submit(queue, &[submit_info], submission.fence.handle())
        }
    }

    fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue()
    }

    fn present_queue(&self) -> vk::Queue {
        self.device.present_queue()
    }

    fn wait_idle(&self) -> RhiResult<()> {
        self.device.wait_idle()
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        info!("Destroying Vulkan context...");

        if let Err(e) = self.device.wait_idle() {
            error!("Failed to wait for device idle during shutdown: {}", e);
        }

        let outstanding = Arc::strong_count(self.device()) - 1;
        if outstanding > 0 {
            warn!(
                "{} device reference(s) still alive at context shutdown",
                outstanding
            );
        }

        // SAFETY: each field is dropped exactly once, here, and never used after.
        unsafe {
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Vulkan context destroyed");
    }
}
