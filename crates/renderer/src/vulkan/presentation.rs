//! Swapchain-backed presentation surface.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use vkframe_platform::SurfaceExtent;
use vkframe_rhi::render_pass::{Framebuffer, RenderPass};
use vkframe_rhi::swapchain::{Swapchain, SwapchainRequest};
use vkframe_rhi::sync::Semaphore;
use vkframe_rhi::{RhiError, RhiResult};

use crate::backend::{AcquireOutcome, PresentOutcome, PresentationSurface};
use crate::vulkan::VulkanContext;

/// Swapchain, its render pass, and one framebuffer per swap image.
pub struct SwapchainPresentation {
    // Dropped before the swapchain whose image views they reference.
    framebuffers: Vec<Framebuffer>,
    swapchain: Swapchain,
    render_pass: RenderPass,
    context: Arc<VulkanContext>,
}

impl SwapchainPresentation {
    /// Creates the swapchain for the context's surface at `extent`.
    pub fn new(
        context: Arc<VulkanContext>,
        extent: SurfaceExtent,
        prefer_mailbox: bool,
    ) -> RhiResult<Self> {
        let device = context.device().clone();
        let surface = context.surface();

        let swapchain = Swapchain::new(
            context.instance(),
            device.clone(),
            surface.handle(),
            surface.loader(),
            SwapchainRequest {
                width: extent.width,
                height: extent.height,
                prefer_mailbox,
            },
        )?;

        let render_pass = RenderPass::new_presentable(device.clone(), swapchain.format())?;
        let framebuffers = Framebuffer::for_views(
            &device,
            &render_pass,
            swapchain.image_views(),
            swapchain.extent(),
        )?;

        info!(
            "Presentation ready: {} images, {:?}",
            framebuffers.len(),
            swapchain.present_mode()
        );

        Ok(Self {
            framebuffers,
            swapchain,
            render_pass,
            context,
        })
    }

    #[inline]
    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    /// Framebuffer wrapping swap image `image_index`.
    pub fn framebuffer(&self, image_index: u32) -> Option<&Framebuffer> {
        self.framebuffers.get(image_index as usize)
    }

    #[inline]
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }
}

/// Maps a raw `vkAcquireNextImageKHR` result.
///
/// Out-of-date is stale. A suboptimal image is still usable and is reported
/// as ready with the flag set. Every other error is returned.
pub fn classify_acquire(result: Result<(u32, bool), vk::Result>) -> RhiResult<AcquireOutcome> {
    match result {
        Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Ready {
            image_index,
            suboptimal,
        }),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::Stale),
        Err(e) => Err(e.into()),
    }
}

/// Maps a raw `vkQueuePresentKHR` result. Out-of-date and suboptimal are both stale.
pub fn classify_present(result: Result<bool, vk::Result>) -> RhiResult<PresentOutcome> {
    match result {
        Ok(false) => Ok(PresentOutcome::Presented),
        Ok(true) => Ok(PresentOutcome::Stale),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR | vk::Result::SUBOPTIMAL_KHR) => {
            Ok(PresentOutcome::Stale)
        }
        Err(e) => Err(e.into()),
    }
}

impl PresentationSurface<VulkanContext> for SwapchainPresentation {
    fn image_count(&self) -> usize {
        self.swapchain.image_count() as usize
    }

    fn extent(&self) -> SurfaceExtent {
        self.swapchain.extent().into()
    }

    fn acquire_next_image(&self, signal: &Semaphore) -> RhiResult<AcquireOutcome> {
        classify_acquire(self.swapchain.acquire_next_image(signal.handle()))
    }

    fn present(
        &self,
        queue: vk::Queue,
        wait: &Semaphore,
        image_index: u32,
    ) -> RhiResult<PresentOutcome> {
        classify_present(self.swapchain.present(queue, image_index, wait.handle()))
    }

    fn recreate(&mut self, extent: SurfaceExtent) -> RhiResult<()> {
        self.framebuffers.clear();
        self.swapchain.recreate(extent.width, extent.height)?;

        // Pipelines are built against the render pass, so it is kept.
        if self.swapchain.format() != self.render_pass.color_format() {
            return Err(RhiError::SwapchainError(format!(
                "surface format changed from {:?} to {:?}",
                self.render_pass.color_format(),
                self.swapchain.format()
            )));
        }

        self.framebuffers = Framebuffer::for_views(
            self.context.device(),
            &self.render_pass,
            self.swapchain.image_views(),
            self.swapchain.extent(),
        )?;

        debug!(
            "Framebuffers rebuilt for {} images at {}",
            self.framebuffers.len(),
            extent
        );
        Ok(())
    }
}
