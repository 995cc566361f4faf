//! Frames-in-flight scheduling.
//!
//! [`FrameScheduler`] drives the acquire, record, submit, present loop over N
//! frame slots and M swap images.
//!
//! # Indexing
//!
//! Semaphores and fences belong to a frame slot and rotate `0..N`. Command
//! buffers belong to a swap image and are indexed by the image the surface
//! hands back, which need not follow slot order. Before an image's command
//! buffer is re-recorded, the scheduler waits on the fence of whichever
//! slot last submitted into that image.
//!
//! # Tick
//!
//! ```text
//! 1. wait slot fence            (CPU throttle, unbounded)
//! 2. acquire image              (signals slot.image_acquired)
//!    stale -> recreate, skip tick
//! 3. reset slot fence
//! 4. wait on image's previous owner slot, if another slot
//! 5. reset + record image's command buffer
//! 6. submit                     (waits image_acquired at COLOR_ATTACHMENT_OUTPUT,
//!                                signals render_finished + slot fence)
//! 7. present                    (waits render_finished)
//! 8. advance slot
//! 9. stale / suboptimal / resize flagged -> recreate
//! ```
//!
//! The fence is reset only after a successful acquire. Resetting first and
//! then skipping the tick would leave a fence that no submission will ever
//! signal.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info, trace};

use vkframe_platform::ExtentSource;

use crate::backend::{
    AcquireOutcome, CommandRecorder, ExecutionContext, FrameInfo, PresentOutcome,
    PresentationSurface, Submission,
};
use crate::error::{FrameError, FrameResult, FrameStage};
use crate::frame_slot::FrameSlot;

/// Result of one [`FrameScheduler::draw_frame`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was submitted and queued for presentation.
    Presented { slot: usize, image_index: u32 },
    /// Presented, then the surface was rebuilt.
    PresentedThenRecreated { slot: usize, image_index: u32 },
    /// Acquisition found the surface stale. Nothing was submitted and the
    /// surface was rebuilt.
    SkippedStale,
    /// Recreation was abandoned because the window is closing.
    Deferred,
}

impl FrameOutcome {
    /// Whether this tick queued an image for presentation.
    pub fn presented(&self) -> bool {
        matches!(
            self,
            FrameOutcome::Presented { .. } | FrameOutcome::PresentedThenRecreated { .. }
        )
    }
}

/// Result of [`FrameScheduler::recreate_surface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecreateOutcome {
    Recreated,
    /// The window closed while minimized; the surface was left as is.
    Deferred,
}

/// Drives frame submission and presentation.
///
/// Fields drop in declaration order after [`Drop::drop`] has idled the
/// device and released slots and command buffers: pool, recorder, surface,
/// then the context.
pub struct FrameScheduler<C, S, R>
where
    C: ExecutionContext,
    S: PresentationSurface<C>,
    R: CommandRecorder<C, S>,
{
    slots: Vec<FrameSlot<C>>,
    command_buffers: Vec<C::CommandBuffer>,
    /// Slot that last submitted into each swap image.
    image_owners: Vec<Option<usize>>,
    command_pool: C::CommandPool,
    recorder: R,
    surface: S,
    context: Arc<C>,
    current_slot: usize,
    frame_number: u64,
    resize_requested: bool,
}

impl<C, S, R> FrameScheduler<C, S, R>
where
    C: ExecutionContext,
    S: PresentationSurface<C>,
    R: CommandRecorder<C, S>,
{
    /// Creates the command pool, one command buffer per swap image, and
    /// `frames_in_flight` slots.
    ///
    /// # Errors
    ///
    /// [`FrameError::InvalidFramesInFlight`] for zero slots, checked before
    /// anything is created. [`FrameError::Setup`] if any object fails to
    /// create; objects created so far are released.
    pub fn new(
        context: Arc<C>,
        surface: S,
        recorder: R,
        frames_in_flight: usize,
    ) -> FrameResult<Self> {
        if frames_in_flight == 0 {
            return Err(FrameError::InvalidFramesInFlight(frames_in_flight));
        }

        let command_pool = context.create_command_pool().map_err(FrameError::Setup)?;

        let image_count = surface.image_count();
        let command_buffers = context
            .allocate_command_buffers(&command_pool, image_count)
            .map_err(FrameError::Setup)?;

        let slots = (0..frames_in_flight)
            .map(|index| FrameSlot::new(context.as_ref(), index))
            .collect::<Result<Vec<_>, _>>()
            .map_err(FrameError::Setup)?;

        info!(
            "Frame scheduler created: {} frames in flight, {} swap images",
            frames_in_flight, image_count
        );

        Ok(Self {
            slots,
            command_buffers,
            image_owners: vec![None; image_count],
            command_pool,
            recorder,
            surface,
            context,
            current_slot: 0,
            frame_number: 0,
            resize_requested: false,
        })
    }

    /// Runs one tick.
    ///
    /// `window` is consulted only if the surface has to be rebuilt.
    ///
    /// # Errors
    ///
    /// [`FrameError::Fatal`] for any failure other than a stale surface.
    pub fn draw_frame(&mut self, window: &mut impl ExtentSource) -> FrameResult<FrameOutcome> {
        let slot_index = self.current_slot;
        let slot = &self.slots[slot_index];

        self.context
            .wait_for_fence(slot.frame_complete(), u64::MAX)
            .map_err(FrameError::at(FrameStage::WaitFence))?;

        let acquired = self
            .surface
            .acquire_next_image(slot.image_acquired())
            .map_err(FrameError::at(FrameStage::Acquire))?;

        let (image_index, acquire_suboptimal) = match acquired {
            AcquireOutcome::Ready {
                image_index,
                suboptimal,
            } => (image_index, suboptimal),
            AcquireOutcome::Stale => {
                debug!("Surface stale at acquire (slot {})", slot_index);
                return Ok(match self.recreate_surface(window)? {
                    RecreateOutcome::Recreated => FrameOutcome::SkippedStale,
                    RecreateOutcome::Deferred => FrameOutcome::Deferred,
                });
            }
        };

        let image = image_index as usize;
        if image >= self.command_buffers.len() {
            return Err(FrameError::Fatal {
                stage: FrameStage::Acquire,
                source: vkframe_rhi::RhiError::SwapchainError(format!(
                    "acquired image {} but the surface has {} images",
                    image_index,
                    self.command_buffers.len()
                )),
            });
        }

        self.context
            .reset_fence(slot.frame_complete())
            .map_err(FrameError::at(FrameStage::ResetFence))?;

        if let Some(owner) = self.image_owners[image]
            && owner != slot_index
        {
            trace!(
                "Image {} last used by slot {}, waiting before reuse",
                image_index, owner
            );
            self.context
                .wait_for_fence(self.slots[owner].frame_complete(), u64::MAX)
                .map_err(FrameError::at(FrameStage::WaitFence))?;
        }
        self.image_owners[image] = Some(slot_index);

        let command_buffer = &self.command_buffers[image];
        self.context
            .reset_command_buffer(command_buffer)
            .map_err(FrameError::at(FrameStage::Record))?;

        let frame = FrameInfo {
            slot: slot_index,
            image_index,
            frame_number: self.frame_number,
        };
        self.recorder
            .record(self.context.as_ref(), command_buffer, frame, &self.surface)
            .map_err(FrameError::at(FrameStage::Record))?;

        self.context
            .submit(
                self.context.graphics_queue(),
                Submission {
                    command_buffer,
                    wait: slot.image_acquired(),
                    wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                    signal: slot.render_finished(),
                    fence: slot.frame_complete(),
                },
            )
            .map_err(FrameError::at(FrameStage::Submit))?;
        self.frame_number += 1;

        let presented = self
            .surface
            .present(
                self.context.present_queue(),
                slot.render_finished(),
                image_index,
            )
            .map_err(FrameError::at(FrameStage::Present))?;

        trace!(
            "Frame {} presented (slot {}, image {})",
            frame.frame_number, slot_index, image_index
        );

        self.current_slot = (slot_index + 1) % self.slots.len();

        let present_stale = presented == PresentOutcome::Stale;
        if present_stale || acquire_suboptimal || self.resize_requested {
            debug!(
                "Recreating after present (stale={}, suboptimal={}, resized={})",
                present_stale, acquire_suboptimal, self.resize_requested
            );
            return Ok(match self.recreate_surface(window)? {
                RecreateOutcome::Recreated => FrameOutcome::PresentedThenRecreated {
                    slot: slot_index,
                    image_index,
                },
                RecreateOutcome::Deferred => FrameOutcome::Deferred,
            });
        }

        Ok(FrameOutcome::Presented {
            slot: slot_index,
            image_index,
        })
    }

    /// Flags the surface for recreation after the next present.
    pub fn notify_resized(&mut self) {
        self.resize_requested = true;
    }

    /// Rebuilds the surface and the per-image command buffers.
    ///
    /// Blocks in [`ExtentSource::wait_events`] while the window has zero
    /// area. Frame slots are left untouched.
    pub fn recreate_surface(
        &mut self,
        window: &mut impl ExtentSource,
    ) -> FrameResult<RecreateOutcome> {
        let mut extent = window.framebuffer_extent();
        while extent.is_zero_area() {
            if window.close_requested() {
                info!("Window closing while minimized, surface recreation deferred");
                return Ok(RecreateOutcome::Deferred);
            }
            trace!("Surface extent is {}, waiting for window events", extent);
            window.wait_events();
            extent = window.framebuffer_extent();
        }

        self.context
            .wait_idle()
            .map_err(FrameError::at(FrameStage::WaitIdle))?;

        self.surface
            .recreate(extent)
            .map_err(FrameError::at(FrameStage::Recreate))?;

        let retired = std::mem::take(&mut self.command_buffers);
        self.context
            .free_command_buffers(&self.command_pool, retired);

        let image_count = self.surface.image_count();
        self.command_buffers = self
            .context
            .allocate_command_buffers(&self.command_pool, image_count)
            .map_err(FrameError::at(FrameStage::Recreate))?;
        self.image_owners = vec![None; image_count];
        self.resize_requested = false;

        info!(
            "Surface recreated at {} with {} images",
            self.surface.extent(),
            image_count
        );
        Ok(RecreateOutcome::Recreated)
    }

    /// Slot the next tick will use.
    #[inline]
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Number of frame slots (N).
    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Number of swap images (M) the command buffers are sized for.
    #[inline]
    pub fn image_count(&self) -> usize {
        self.command_buffers.len()
    }

    /// Frames submitted so far.
    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    #[inline]
    pub fn resize_requested(&self) -> bool {
        self.resize_requested
    }

    /// Slot that last submitted into `image_index`, if any since the last
    /// recreation.
    pub fn image_owner(&self, image_index: u32) -> Option<usize> {
        self.image_owners
            .get(image_index as usize)
            .copied()
            .flatten()
    }

    #[inline]
    pub fn slots(&self) -> &[FrameSlot<C>] {
        &self.slots
    }

    #[inline]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[inline]
    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    #[inline]
    pub fn recorder_mut(&mut self) -> &mut R {
        &mut self.recorder
    }

    #[inline]
    pub fn context(&self) -> &Arc<C> {
        &self.context
    }
}

impl<C, S, R> Drop for FrameScheduler<C, S, R>
where
    C: ExecutionContext,
    S: PresentationSurface<C>,
    R: CommandRecorder<C, S>,
{
    fn drop(&mut self) {
        if let Err(e) = self.context.wait_idle() {
            error!("Failed to wait for device idle during shutdown: {}", e);
        }

        self.slots.clear();

        let buffers = std::mem::take(&mut self.command_buffers);
        self.context.free_command_buffers(&self.command_pool, buffers);

        info!("Frame scheduler shut down after {} frames", self.frame_number);
    }
}
