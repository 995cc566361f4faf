//! Collaborator interfaces the frame scheduler drives.
//!
//! The scheduler is generic over these traits so the synchronization
//! protocol can run against Vulkan (see [`crate::vulkan`]) or against an
//! in-memory GPU in tests.
//!
//! - [`ExecutionContext`]: device, queues, primitive factories, submission
//! - [`PresentationSurface`]: swap images, acquisition, presentation, recreation
//! - [`CommandRecorder`]: fills one command buffer per frame

use ash::vk;

use vkframe_platform::SurfaceExtent;
use vkframe_rhi::RhiResult;

/// Owner of the logical device and its queues.
///
/// Every object handed out is an owning value whose `Drop` releases it.
/// Command buffers are the exception: they go back through
/// [`free_command_buffers`](Self::free_command_buffers), or are released
/// together with their pool.
pub trait ExecutionContext {
    type Semaphore;
    type Fence;
    type CommandPool;
    type CommandBuffer;
    type Queue: Copy;

    /// Unsignaled GPU-to-GPU signal.
    fn create_semaphore(&self) -> RhiResult<Self::Semaphore>;

    fn create_fence(&self, signaled: bool) -> RhiResult<Self::Fence>;

    /// Pool on the graphics family whose buffers can be reset individually.
    fn create_command_pool(&self) -> RhiResult<Self::CommandPool>;

    fn allocate_command_buffers(
        &self,
        pool: &Self::CommandPool,
        count: usize,
    ) -> RhiResult<Vec<Self::CommandBuffer>>;

    fn free_command_buffers(&self, pool: &Self::CommandPool, buffers: Vec<Self::CommandBuffer>);

    /// Blocks until `fence` signals or `timeout` nanoseconds pass.
    fn wait_for_fence(&self, fence: &Self::Fence, timeout: u64) -> RhiResult<()>;

    fn reset_fence(&self, fence: &Self::Fence) -> RhiResult<()>;

    fn reset_command_buffer(&self, buffer: &Self::CommandBuffer) -> RhiResult<()>;

    fn submit(&self, queue: Self::Queue, submission: Submission<'_, Self>) -> RhiResult<()>;

    fn graphics_queue(&self) -> Self::Queue;

    fn present_queue(&self) -> Self::Queue;

    /// Blocks until all queues are idle.
    fn wait_idle(&self) -> RhiResult<()>;
}

/// One command buffer submission with its synchronization.
pub struct Submission<'a, C: ExecutionContext + ?Sized> {
    pub command_buffer: &'a C::CommandBuffer,
    /// Waited on by the GPU at `wait_stage`.
    pub wait: &'a C::Semaphore,
    pub wait_stage: vk::PipelineStageFlags,
    /// Signaled when the command buffer completes.
    pub signal: &'a C::Semaphore,
    /// Signaled when the command buffer completes.
    pub fence: &'a C::Fence,
}

/// Result of asking the surface for the next image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The signal passed in will fire once the image is writable.
    Ready { image_index: u32, suboptimal: bool },
    /// The surface no longer matches its window; nothing was signaled.
    Stale,
}

/// Result of queueing an image for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// Out of date or suboptimal; the surface must be rebuilt.
    Stale,
}

/// Chain of presentable images.
pub trait PresentationSurface<C: ExecutionContext> {
    /// Number of swap images (M).
    fn image_count(&self) -> usize;

    fn extent(&self) -> SurfaceExtent;

    fn acquire_next_image(&self, signal: &C::Semaphore) -> RhiResult<AcquireOutcome>;

    fn present(
        &self,
        queue: C::Queue,
        wait: &C::Semaphore,
        image_index: u32,
    ) -> RhiResult<PresentOutcome>;

    /// Rebuilds every image-dependent object for `extent`.
    ///
    /// Called only after the device is idle.
    fn recreate(&mut self, extent: SurfaceExtent) -> RhiResult<()>;
}

/// Per-frame identifiers passed to the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Frame slot whose primitives guard this frame.
    pub slot: usize,
    /// Swap image the frame renders into.
    pub image_index: u32,
    /// Count of frames submitted before this one.
    pub frame_number: u64,
}

/// Records the commands for one frame.
pub trait CommandRecorder<C: ExecutionContext, S: PresentationSurface<C>> {
    /// Fills `command_buffer`, which has just been reset, with a complete
    /// frame targeting `frame.image_index`.
    fn record(
        &mut self,
        context: &C,
        command_buffer: &C::CommandBuffer,
        frame: FrameInfo,
        surface: &S,
    ) -> RhiResult<()>;
}
