//! Command pool and command buffer management.
//!
//! - [`CommandPool`] owns a `VkCommandPool` and allocates primary buffers
//! - [`CommandBuffer`] wraps a `VkCommandBuffer` with recording helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vkframe_rhi::device::Device;
//! use vkframe_rhi::command::CommandPool;
//!
//! # fn example(device: Arc<Device>) -> Result<(), vkframe_rhi::RhiError> {
//! let pool = CommandPool::new(device.clone(), device.graphics_family())?;
//! let buffers = pool.allocate_command_buffers(3)?;
//!
//! buffers[0].begin()?;
//! // ... record commands ...
//! buffers[0].end()?;
//!
//! pool.free_command_buffers(buffers);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan command pool wrapper.
///
/// Created with `RESET_COMMAND_BUFFER`, so each buffer can be reset and
/// re-recorded on its own. Destroying the pool frees any buffers still
/// allocated from it.
///
/// # Thread Safety
///
/// Command pools are externally synchronized. Record from one thread per pool.
pub struct CommandPool {
    device: Arc<Device>,
    pool: vk::CommandPool,
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a resettable command pool for `queue_family_index`.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device that owns the pool
    /// * `queue_family_index` - Family whose queues will execute the buffers
    ///
    /// # Errors
    ///
    /// Returns an error if command pool creation fails.
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = unsafe { device.handle().create_command_pool(&create_info, None)? };

        info!(
            "Command pool created for queue family {}",
            queue_family_index
        );

        Ok(Self {
            device,
            pool,
            queue_family_index,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Allocates `count` primary command buffers.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn allocate_command_buffers(&self, count: u32) -> RhiResult<Vec<CommandBuffer>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let buffers = unsafe { self.device.handle().allocate_command_buffers(&alloc_info)? };
        debug!("Allocated {} command buffer(s)", buffers.len());

        Ok(buffers
            .into_iter()
            .map(|buffer| CommandBuffer {
                device: self.device.clone(),
                buffer,
            })
            .collect())
    }

    /// Returns `buffers` to the pool.
    ///
    /// None of the buffers may be pending execution.
    pub fn free_command_buffers(&self, buffers: Vec<CommandBuffer>) {
        if buffers.is_empty() {
            return;
        }

        let handles: Vec<vk::CommandBuffer> = buffers.iter().map(CommandBuffer::handle).collect();
        unsafe {
            self.device
                .handle()
                .free_command_buffers(self.pool, &handles);
        }
        debug!("Freed {} command buffer(s)", handles.len());
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_command_pool(self.pool, None);
        }
        info!(
            "Command pool destroyed for queue family {}",
            self.queue_family_index
        );
    }
}

/// Vulkan command buffer wrapper.
///
/// Does not own the handle: it is released by
/// [`CommandPool::free_command_buffers`] or by destroying the pool.
pub struct CommandBuffer {
    device: Arc<Device>,
    buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    // =========================================================================
    // Recording Control
    // =========================================================================

    /// Begins recording for a single submission.
    pub fn begin(&self) -> RhiResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .handle()
                .begin_command_buffer(self.buffer, &begin_info)?;
        }

        Ok(())
    }

    /// Ends recording. The buffer is then executable.
    pub fn end(&self) -> RhiResult<()> {
        unsafe {
            self.device.handle().end_command_buffer(self.buffer)?;
        }

        Ok(())
    }

    /// Returns the buffer to the initial state so it can be re-recorded.
    ///
    /// The buffer must not be pending execution.
    pub fn reset(&self) -> RhiResult<()> {
        unsafe {
            self.device
                .handle()
                .reset_command_buffer(self.buffer, vk::CommandBufferResetFlags::empty())?;
        }

        Ok(())
    }

    // =========================================================================
    // Render Pass
    // =========================================================================

    /// Begins a render pass with inline subpass contents.
    pub fn begin_render_pass(&self, begin_info: &vk::RenderPassBeginInfo<'_>) {
        unsafe {
            self.device.handle().cmd_begin_render_pass(
                self.buffer,
                begin_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    pub fn end_render_pass(&self) {
        unsafe {
            self.device.handle().cmd_end_render_pass(self.buffer);
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn bind_pipeline(&self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .handle()
                .cmd_bind_pipeline(self.buffer, bind_point, pipeline);
        }
    }

    pub fn set_viewport(&self, viewport: &vk::Viewport) {
        unsafe {
            self.device
                .handle()
                .cmd_set_viewport(self.buffer, 0, std::slice::from_ref(viewport));
        }
    }

    pub fn set_scissor(&self, scissor: &vk::Rect2D) {
        unsafe {
            self.device
                .handle()
                .cmd_set_scissor(self.buffer, 0, std::slice::from_ref(scissor));
        }
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    /// Issues a non-indexed draw.
    ///
    /// # Arguments
    ///
    /// * `vertex_count` - Vertices to draw
    /// * `instance_count` - Instances to draw
    /// * `first_vertex` - Value of `gl_VertexIndex` for the first vertex
    /// * `first_instance` - Value of `gl_InstanceIndex` for the first instance
    pub fn draw(
        &self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.handle().cmd_draw(
                self.buffer,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }
}
