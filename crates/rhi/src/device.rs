//! Logical device and queues.
//!
//! # Overview
//!
//! [`Device`] owns the `VkDevice` plus the graphics and present queues:
//! - one queue per unique family, so a shared graphics+present family yields one queue
//! - only the swapchain extension is enabled
//! - no optional features are requested
//!
//! It is always handed out as `Arc<Device>`; every other RHI wrapper keeps a
//! clone so the device is destroyed last.
//!
//! # Example
//!
//! ```no_run
//! use vkframe_rhi::device::Device;
//! use vkframe_rhi::instance::Instance;
//! use vkframe_rhi::physical_device::select_physical_device;
//! use ash::vk;
//!
//! # fn example() -> Result<(), vkframe_rhi::RhiError> {
//! let instance = Instance::new(c"example", false, &[])?;
//! let surface = vk::SurfaceKHR::null(); // normally created from the window
//! let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
//!
//! let info = select_physical_device(instance.handle(), surface, &surface_loader)?;
//! let device = Device::new(&instance, &info)?;
//!
//! let graphics = device.graphics_queue();
//! let present = device.present_queue();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info};

use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;
use crate::physical_device::{PhysicalDeviceInfo, QueueFamilyIndices, REQUIRED_DEVICE_EXTENSIONS};

/// Logical device wrapper.
///
/// # Thread Safety
///
/// Shared across threads through `Arc`. Queue submission is externally
/// synchronized by Vulkan; callers must not submit to the same queue from
/// two threads at once.
pub struct Device {
    /// Loaded device-level function table and handle.
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    graphics_queue: vk::Queue,
    /// Same handle as `graphics_queue` when the families match.
    present_queue: vk::Queue,
    queue_families: QueueFamilyIndices,
}

impl Device {
    /// Creates the logical device with one queue per unique family.
    ///
    /// # Arguments
    ///
    /// * `instance` - The Vulkan instance the physical device came from
    /// * `physical_device_info` - The device chosen by
    ///   [`select_physical_device`](crate::physical_device::select_physical_device)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The queue families are incomplete
    /// - Device creation fails
    pub fn new(
        instance: &Instance,
        physical_device_info: &PhysicalDeviceInfo,
    ) -> RhiResult<Arc<Self>> {
        let queue_families = physical_device_info.queue_families;
        let (Some(graphics_family), Some(present_family)) =
            (queue_families.graphics_family, queue_families.present_family)
        else {
            return Err(RhiError::NoSuitableGpu);
        };

        let unique_families = queue_families.unique_families();
        let queue_priorities = [1.0f32];

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        debug!(
            "Creating {} queue(s) for families: {:?}",
            queue_create_infos.len(),
            unique_families
        );

        let features = vk::PhysicalDeviceFeatures::default();

        let extension_names: Vec<*const std::ffi::c_char> = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|ext| ext.as_ptr())
            .collect();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device_info.device, &create_info, None)?
        };

        info!(
            "Logical device created with {} extension(s)",
            extension_names.len()
        );

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };
        debug!(
            "Queues retrieved (graphics family {}, present family {})",
            graphics_family, present_family
        );

        Ok(Arc::new(Self {
            device,
            physical_device: physical_device_info.device,
            graphics_queue,
            present_queue,
            queue_families,
        }))
    }

    /// Returns the ash device for raw Vulkan calls.
    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    #[inline]
    pub fn queue_families(&self) -> &QueueFamilyIndices {
        &self.queue_families
    }

    /// Index of the graphics queue family.
    #[inline]
    pub fn graphics_family(&self) -> u32 {
        // Checked complete in `new`
        self.queue_families.graphics_family.unwrap_or_default()
    }

    /// Blocks until every queue on the device is idle.
    ///
    /// Used before swapchain recreation and at shutdown, where every object
    /// that pending work references is about to be destroyed.
    pub fn wait_idle(&self) -> RhiResult<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Submits work to `queue`.
    ///
    /// # Safety
    ///
    /// Every handle referenced by `submit_infos` and `fence` must be valid,
    /// and the command buffers must not be pending on another submission.
    pub unsafe fn submit(
        &self,
        queue: vk::Queue,
        submit_infos: &[vk::SubmitInfo<'_>],
        fence: vk::Fence,
    ) -> RhiResult<()> {
        unsafe { self.device.queue_submit(queue, submit_infos, fence)? };
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                error!("Failed to wait for device idle during drop: {:?}", e);
            }
            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}
