//! Swapchain management.
//!
//! [`Swapchain`] owns the `VkSwapchainKHR` and one image view per swap image.
//! Format, present mode, extent and image count are negotiated against the
//! surface on every (re)creation:
//!
//! - format: B8G8R8A8_SRGB / SRGB_NONLINEAR, then B8G8R8A8_UNORM, then the first offered
//! - present mode: MAILBOX when preferred and available, otherwise FIFO
//! - extent: the surface's current extent, or the requested size clamped to its limits
//! - image count: minimum + 1, capped at the maximum

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;

/// Surface capabilities, formats and present modes for a physical device.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries swapchain support for a physical device and surface.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> RhiResult<Self> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };

        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?
        };

        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };

        debug!(
            "Swapchain support: {} formats, {} present modes, image count: {}-{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            if capabilities.max_image_count == 0 {
                "unlimited".to_string()
            } else {
                capabilities.max_image_count.to_string()
            }
        );

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// At least one format and one present mode are available.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Parameters for creating or recreating a swapchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainRequest {
    /// Requested width, used when the surface leaves the extent to the swapchain.
    pub width: u32,
    /// Requested height, used when the surface leaves the extent to the swapchain.
    pub height: u32,
    /// Use MAILBOX when the surface supports it.
    pub prefer_mailbox: bool,
}

/// Vulkan swapchain with its image views.
pub struct Swapchain {
    device: Arc<Device>,
    swapchain_loader: ash::khr::swapchain::Device,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    prefer_mailbox: bool,
}

impl Swapchain {
    /// Creates a swapchain for `surface`.
    ///
    /// The surface must outlive the swapchain.
    ///
    /// # Arguments
    ///
    /// * `instance` - Instance used to load the swapchain extension functions
    /// * `device` - The logical device; its queue families decide the sharing mode
    /// * `surface` - Target window surface
    /// * `surface_loader` - Surface extension functions for the support queries
    /// * `request` - Size used when the surface leaves the extent open, and the
    ///   present-mode preference
    ///
    /// # Errors
    ///
    /// Returns an error if the surface support is inadequate or any Vulkan
    /// call fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use ash::vk;
    /// use vkframe_rhi::device::Device;
    /// use vkframe_rhi::instance::Instance;
    /// use vkframe_rhi::swapchain::{Swapchain, SwapchainRequest};
    ///
    /// # fn example(
    /// #     instance: &Instance,
    /// #     device: Arc<Device>,
    /// #     surface: vk::SurfaceKHR,
    /// #     surface_loader: &ash::khr::surface::Instance,
    /// # ) -> Result<(), vkframe_rhi::RhiError> {
    /// let request = SwapchainRequest {
    ///     width: 800,
    ///     height: 600,
    ///     prefer_mailbox: true,
    /// };
    /// let mut swapchain = Swapchain::new(instance, device, surface, surface_loader, request)?;
    ///
    /// // After a resize, once the device is idle
    /// swapchain.recreate(1024, 768)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
        request: SwapchainRequest,
    ) -> RhiResult<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(instance.handle(), device.handle());

        let mut swapchain = Self {
            device,
            swapchain_loader,
            surface_loader: surface_loader.clone(),
            surface,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            format: vk::Format::UNDEFINED,
            extent: vk::Extent2D::default(),
            present_mode: vk::PresentModeKHR::FIFO,
            prefer_mailbox: request.prefer_mailbox,
        };
        swapchain.build(request.width, request.height)?;

        Ok(swapchain)
    }

    /// Rebuilds the swapchain and its image views for a new size.
    ///
    /// The old swapchain is passed to the driver as `old_swapchain` and then
    /// destroyed. The caller must make sure no submitted work still uses the
    /// old images.
    pub fn recreate(&mut self, width: u32, height: u32) -> RhiResult<()> {
        info!("Recreating swapchain for new size: {}x{}", width, height);

        self.destroy_image_views();
        self.build(width, height)
    }

    fn build(&mut self, width: u32, height: u32) -> RhiResult<()> {
        let support = SwapchainSupportDetails::query(
            self.device.physical_device(),
            self.surface,
            &self.surface_loader,
        )?;

        if !support.is_adequate() {
            return Err(RhiError::SwapchainError(
                "Inadequate swapchain support (no formats or present modes)".to_string(),
            ));
        }

        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes, self.prefer_mailbox);
        let extent = choose_extent(&support.capabilities, width, height);
        let image_count = determine_image_count(&support.capabilities);

        info!(
            "Creating swapchain: {}x{}, format {:?}, present mode {:?}, {} images requested",
            extent.width, extent.height, surface_format.format, present_mode, image_count
        );

        let queue_families = self.device.queue_families();
        let family_indices: Vec<u32> = queue_families.unique_families();

        let (sharing_mode, family_slice) = if queue_families.is_split() {
            debug!(
                "Using CONCURRENT sharing mode across queue families {:?}",
                family_indices
            );
            (vk::SharingMode::CONCURRENT, family_indices.as_slice())
        } else {
            (vk::SharingMode::EXCLUSIVE, &[][..])
        };

        let old_swapchain = self.swapchain;

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(family_slice)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe { self.swapchain_loader.create_swapchain(&create_info, None)? };

        if old_swapchain != vk::SwapchainKHR::null() {
            unsafe { self.swapchain_loader.destroy_swapchain(old_swapchain, None) };
            debug!("Destroyed retired swapchain");
        }
        self.swapchain = swapchain;

        self.images = unsafe { self.swapchain_loader.get_swapchain_images(swapchain)? };
        self.image_views = create_image_views(&self.device, &self.images, surface_format.format)?;
        self.format = surface_format.format;
        self.extent = extent;
        self.present_mode = present_mode;

        info!("Swapchain ready with {} images", self.images.len());
        Ok(())
    }

    /// Acquires the next image, signaling `semaphore` once it is writable.
    ///
    /// Returns the image index and whether the swapchain is suboptimal.
    /// `ERROR_OUT_OF_DATE_KHR` is returned unchanged for the caller to classify.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<(u32, bool), vk::Result> {
        unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        }
    }

    /// Queues `image_index` for presentation after `wait_semaphore` signals.
    ///
    /// Returns whether the swapchain is suboptimal.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<bool, vk::Result> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe { self.swapchain_loader.queue_present(queue, &present_info) }
    }

    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    #[inline]
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    #[inline]
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    fn destroy_image_views(&mut self) {
        for image_view in self.image_views.drain(..) {
            unsafe {
                self.device.handle().destroy_image_view(image_view, None);
            }
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.destroy_image_views();

        if self.swapchain != vk::SwapchainKHR::null() {
            unsafe {
                self.swapchain_loader
                    .destroy_swapchain(self.swapchain, None);
            }

            info!(
                "Swapchain destroyed (was {}x{}, {} images)",
                self.extent.width,
                self.extent.height,
                self.images.len()
            );
        }
    }
}

fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    let preferred = formats.iter().find(|f| {
        f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
    });

    if let Some(&format) = preferred {
        debug!("Selected preferred surface format: B8G8R8A8_SRGB with SRGB_NONLINEAR");
        return format;
    }

    let alternative = formats.iter().find(|f| {
        f.format == vk::Format::B8G8R8A8_UNORM && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
    });

    if let Some(&format) = alternative {
        warn!("Using fallback surface format: B8G8R8A8_UNORM with SRGB_NONLINEAR");
        return format;
    }

    // Callers check is_adequate first, so formats is non-empty
    let first = formats.first().copied().unwrap_or_default();
    warn!("Using first available surface format: {:?}", first.format);
    first
}

fn choose_present_mode(present_modes: &[vk::PresentModeKHR], prefer_mailbox: bool) -> vk::PresentModeKHR {
    if prefer_mailbox && present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        debug!("Selected MAILBOX present mode");
        return vk::PresentModeKHR::MAILBOX;
    }

    // FIFO is always available
    debug!("Selected FIFO present mode (vsync)");
    vk::PresentModeKHR::FIFO
}

fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    width: u32,
    height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        debug!(
            "Using current surface extent: {}x{}",
            capabilities.current_extent.width, capabilities.current_extent.height
        );
        return capabilities.current_extent;
    }

    let extent = vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    };

    debug!(
        "Calculated extent: {}x{} (requested: {}x{})",
        extent.width, extent.height, width, height
    );

    extent
}

fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;

    // max_image_count of 0 means no maximum
    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}

fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
) -> RhiResult<Vec<vk::ImageView>> {
    let mut image_views = Vec::with_capacity(images.len());

    for (i, &image) in images.iter().enumerate() {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .level_count(1)
                    .layer_count(1),
            );

        match unsafe { device.handle().create_image_view(&create_info, None) } {
            Ok(view) => image_views.push(view),
            Err(e) => {
                for view in image_views {
                    unsafe { device.handle().destroy_image_view(view, None) };
                }
                return Err(RhiError::SwapchainError(format!(
                    "Failed to create image view {}: {:?}",
                    i, e
                )));
            }
        }
    }

    debug!("Created {} image views", image_views.len());
    Ok(image_views)
}
