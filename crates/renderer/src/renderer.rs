//! Renderer assembly.
//!
//! [`Renderer`] wires the Vulkan context, swapchain presentation and
//! triangle recorder into a [`FrameScheduler`] from application config.

use std::sync::Arc;

use tracing::{debug, info};

use vkframe_core::AppConfig;
use vkframe_platform::{ExtentSource, Window};

use crate::error::{FrameError, FrameResult};
use crate::frame_scheduler::{FrameOutcome, FrameScheduler};
use crate::vulkan::{SwapchainPresentation, TrianglePass, VulkanContext};

/// Scheduler specialised to the Vulkan collaborators.
pub type VulkanScheduler = FrameScheduler<VulkanContext, SwapchainPresentation, TrianglePass>;

/// Window-bound renderer.
///
/// # Resource Destruction Order
///
/// Everything lives inside the scheduler, whose drop waits for the device,
/// releases slots and command buffers, then the recorder, the presentation
/// and finally the last reference to the context.
///
/// The renderer must be dropped before the window it was created for.
pub struct Renderer {
    scheduler: VulkanScheduler,
}

impl Renderer {
    /// Creates a renderer for `window`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Setup`] if any Vulkan object cannot be created,
    /// or [`FrameError::InvalidFramesInFlight`] for a zero slot count.
    pub fn new(config: &AppConfig, window: &Window) -> FrameResult<Self> {
        let extent = window.framebuffer_extent();
        info!("Initializing Vulkan renderer ({})", extent);

        let context = Arc::new(VulkanContext::new(
            window,
            config.graphics.validation_enabled(),
        )
        .map_err(FrameError::Setup)?);

        let presentation = SwapchainPresentation::new(
            Arc::clone(&context),
            extent,
            config.graphics.prefer_mailbox,
        )
        .map_err(FrameError::Setup)?;

        let recorder = TrianglePass::new(
            &context,
            &presentation,
            &config.graphics.vertex_shader,
            &config.graphics.fragment_shader,
            config.graphics.clear_color,
        )
        .map_err(FrameError::Setup)?;

        let scheduler = FrameScheduler::new(
            context,
            presentation,
            recorder,
            config.frames.frames_in_flight,
        )?;

        info!(
            "Renderer initialized: {} swapchain images, {} frames in flight",
            scheduler.image_count(),
            scheduler.frames_in_flight()
        );

        Ok(Self { scheduler })
    }

    /// Renders one frame. See [`FrameScheduler::draw_frame`].
    pub fn draw_frame(&mut self, window: &mut impl ExtentSource) -> FrameResult<FrameOutcome> {
        self.scheduler.draw_frame(window)
    }

    /// Flags the swapchain for recreation after the next present.
    pub fn resize(&mut self) {
        debug!("Resize triggered");
        self.scheduler.notify_resized();
    }

    #[inline]
    pub fn scheduler(&self) -> &VulkanScheduler {
        &self.scheduler
    }
}
