//! Render pass and framebuffers for presenting to swap images.
//!
//! The pass has a single color attachment in the swapchain format. It is
//! cleared on load, stored, and transitioned from `UNDEFINED` to
//! `PRESENT_SRC_KHR`. An external subpass dependency at
//! `COLOR_ATTACHMENT_OUTPUT` orders the layout transition after the
//! image-acquired semaphore wait.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan render pass wrapper.
pub struct RenderPass {
    device: Arc<Device>,
    render_pass: vk::RenderPass,
    color_format: vk::Format,
}

impl RenderPass {
    /// Creates a single-subpass color pass targeting presentable images.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device that owns the pass
    /// * `color_format` - Swapchain image format. Framebuffers and pipelines
    ///   built against the pass must use the same format.
    ///
    /// # Errors
    ///
    /// Returns an error if render pass creation fails.
    pub fn new_presentable(device: Arc<Device>, color_format: vk::Format) -> RhiResult<Self> {
        let attachments = [color_attachment(color_format)];

        let color_refs = [vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];

        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)];

        let dependencies = [acquire_dependency()];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe { device.handle().create_render_pass(&create_info, None)? };

        debug!("Render pass created for format {:?}", color_format);

        Ok(Self {
            device,
            render_pass,
            color_format,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Format of the color attachment the pass was built for.
    #[inline]
    pub fn color_format(&self) -> vk::Format {
        self.color_format
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_render_pass(self.render_pass, None);
        }
        debug!("Render pass destroyed");
    }
}

fn color_attachment(format: vk::Format) -> vk::AttachmentDescription {
    vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
}

/// Makes the subpass wait for the acquire semaphore's stage before writing.
fn acquire_dependency() -> vk::SubpassDependency {
    vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
}

/// Vulkan framebuffer wrapper bound to one image view.
pub struct Framebuffer {
    device: Arc<Device>,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
}

impl Framebuffer {
    /// Creates a framebuffer for `view` compatible with `render_pass`.
    pub fn new(
        device: Arc<Device>,
        render_pass: &RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        let attachments = [view];

        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.handle())
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { device.handle().create_framebuffer(&create_info, None)? };

        Ok(Self {
            device,
            framebuffer,
            extent,
        })
    }

    /// Creates one framebuffer per view.
    ///
    /// Framebuffers created before a failure are released when the partial
    /// vector is dropped.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use vkframe_rhi::device::Device;
    /// use vkframe_rhi::render_pass::{Framebuffer, RenderPass};
    /// use vkframe_rhi::swapchain::Swapchain;
    ///
    /// # fn example(device: Arc<Device>, swapchain: &Swapchain) -> Result<(), vkframe_rhi::RhiError> {
    /// let render_pass = RenderPass::new_presentable(device.clone(), swapchain.format())?;
    /// let framebuffers = Framebuffer::for_views(
    ///     &device,
    ///     &render_pass,
    ///     swapchain.image_views(),
    ///     swapchain.extent(),
    /// )?;
    /// assert_eq!(framebuffers.len(), swapchain.image_count() as usize);
    /// # Ok(())
    /// # }
    /// ```
    pub fn for_views(
        device: &Arc<Device>,
        render_pass: &RenderPass,
        views: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> RhiResult<Vec<Self>> {
        let framebuffers = views
            .iter()
            .map(|&view| Self::new(device.clone(), render_pass, view, extent))
            .collect::<RhiResult<Vec<_>>>()?;

        debug!(
            "Created {} framebuffer(s) at {}x{}",
            framebuffers.len(),
            extent.width,
            extent.height
        );

        Ok(framebuffers)
    }

    #[inline]
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_framebuffer(self.framebuffer, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_attachment_clears_and_presents() {
        let attachment = color_attachment(vk::Format::B8G8R8A8_SRGB);
        assert_eq!(attachment.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(attachment.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(attachment.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(attachment.initial_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(attachment.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    #[test]
    fn test_acquire_dependency_waits_on_color_output() {
        let dependency = acquire_dependency();
        assert_eq!(dependency.src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(dependency.dst_subpass, 0);
        assert_eq!(
            dependency.src_stage_mask,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert_eq!(
            dependency.dst_access_mask,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        );
    }

    #[test]
    fn test_render_pass_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RenderPass>();
        assert_send_sync::<Framebuffer>();
    }
}
