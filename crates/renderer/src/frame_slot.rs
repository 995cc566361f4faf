//! Per-slot synchronization primitives.

use tracing::debug;

use vkframe_rhi::RhiResult;

use crate::backend::ExecutionContext;

/// One of the N rotating frame slots.
///
/// The fence is created signaled so the first wait on the slot returns
/// immediately. The slot is only reused after that fence is observed
/// signaled again.
pub struct FrameSlot<C: ExecutionContext> {
    image_acquired: C::Semaphore,
    render_finished: C::Semaphore,
    frame_complete: C::Fence,
}

impl<C: ExecutionContext> FrameSlot<C> {
    /// Creates the slot's primitives.
    ///
    /// On failure, primitives already created are dropped.
    pub fn new(context: &C, index: usize) -> RhiResult<Self> {
        let image_acquired = context.create_semaphore()?;
        let render_finished = context.create_semaphore()?;
        let frame_complete = context.create_fence(true)?;

        debug!("Created frame slot {}", index);

        Ok(Self {
            image_acquired,
            render_finished,
            frame_complete,
        })
    }

    /// Signaled when the acquired image is safe to render into.
    #[inline]
    pub fn image_acquired(&self) -> &C::Semaphore {
        &self.image_acquired
    }

    /// Signaled when the slot's submission finishes; gates presentation.
    #[inline]
    pub fn render_finished(&self) -> &C::Semaphore {
        &self.render_finished
    }

    /// Signaled when the slot's submission retires; gates slot reuse.
    #[inline]
    pub fn frame_complete(&self) -> &C::Fence {
        &self.frame_complete
    }
}
