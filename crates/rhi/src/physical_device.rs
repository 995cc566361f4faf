//! Physical device selection.
//!
//! A device qualifies when it exposes a graphics queue family, a family that
//! can present to the target surface, the swapchain extension, and at least
//! one surface format and present mode. Among qualifying devices the highest
//! [`rate_device`] score wins, which favors discrete GPUs.

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::RhiError;

/// Device extensions every candidate must support.
pub const REQUIRED_DEVICE_EXTENSIONS: [&CStr; 1] = [ash::khr::swapchain::NAME];

/// Queue family indices used for rendering and presentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Both families were found.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Distinct family indices, graphics first.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);

        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }

        families
    }

    /// Graphics and present live in different families.
    #[inline]
    pub fn is_split(&self) -> bool {
        self.is_complete() && self.graphics_family != self.present_family
    }
}

/// Information about a selected physical device.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    pub device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub queue_families: QueueFamilyIndices,
}

impl PhysicalDeviceInfo {
    pub fn device_name(&self) -> &str {
        self.properties
            .device_name_as_c_str()
            .ok()
            .and_then(|name| name.to_str().ok())
            .unwrap_or("Unknown Device")
    }

    pub fn device_type_name(&self) -> &'static str {
        match self.properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
            vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
            vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
            vk::PhysicalDeviceType::CPU => "CPU",
            _ => "Other",
        }
    }

    pub fn api_version(&self) -> (u32, u32, u32) {
        let version = self.properties.api_version;
        (
            vk::api_version_major(version),
            vk::api_version_minor(version),
            vk::api_version_patch(version),
        )
    }

    /// Total size of device-local heaps in bytes.
    pub fn device_local_memory(&self) -> u64 {
        self.memory_properties
            .memory_heaps
            .iter()
            .take(self.memory_properties.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size)
            .sum()
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (major, minor, patch) = self.api_version();
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field("api_version", &format!("{}.{}.{}", major, minor, patch))
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

/// Selects the best physical device able to present to `surface`.
///
/// # Arguments
///
/// * `instance` - Instance to enumerate devices from
/// * `surface` - Surface the chosen device must be able to present to
/// * `surface_loader` - Surface extension functions for the support queries
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableGpu`] if no device qualifies.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Result<PhysicalDeviceInfo, RhiError> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoSuitableGpu);
    }

    info!("Found {} GPU(s)", devices.len());

    let mut suitable_devices: Vec<(PhysicalDeviceInfo, u32)> = Vec::new();

    for device in devices {
        if let Some(info) = check_device_suitability(instance, device, surface, surface_loader) {
            let score = rate_device(&info);
            debug!(
                "GPU '{}' ({}) - Score: {}",
                info.device_name(),
                info.device_type_name(),
                score
            );
            suitable_devices.push((info, score));
        }
    }

    let (selected_device, score) = suitable_devices
        .into_iter()
        .max_by_key(|(_, score)| *score)
        .ok_or_else(|| {
            warn!("No suitable GPU found with required capabilities");
            RhiError::NoSuitableGpu
        })?;

    let (major, minor, patch) = selected_device.api_version();
    info!(
        "Selected GPU: '{}' ({}) - Vulkan {}.{}.{}, Score: {}",
        selected_device.device_name(),
        selected_device.device_type_name(),
        major,
        minor,
        patch,
        score
    );

    Ok(selected_device)
}

fn check_device_suitability(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Option<PhysicalDeviceInfo> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };

    let device_name = properties
        .device_name_as_c_str()
        .ok()
        .and_then(|name| name.to_str().ok())
        .unwrap_or("Unknown")
        .to_owned();

    let families = unsafe { instance.get_physical_device_queue_family_properties(device) };
    let queue_families = find_queue_families(&families, |index| unsafe {
        surface_loader
            .get_physical_device_surface_support(device, index, surface)
            .unwrap_or(false)
    });

    if !queue_families.is_complete() {
        debug!(
            "GPU '{}' skipped: missing required queue families (graphics={}, present={})",
            device_name,
            queue_families.graphics_family.is_some(),
            queue_families.present_family.is_some()
        );
        return None;
    }

    let extensions =
        unsafe { instance.enumerate_device_extension_properties(device) }.unwrap_or_default();
    if !supports_extensions(&extensions, &REQUIRED_DEVICE_EXTENSIONS) {
        debug!("GPU '{}' skipped: swapchain extension missing", device_name);
        return None;
    }

    // Only meaningful once the swapchain extension is known to exist
    let formats = unsafe {
        surface_loader.get_physical_device_surface_formats(device, surface)
    }
    .unwrap_or_default();
    let present_modes = unsafe {
        surface_loader.get_physical_device_surface_present_modes(device, surface)
    }
    .unwrap_or_default();
    if formats.is_empty() || present_modes.is_empty() {
        debug!(
            "GPU '{}' skipped: inadequate swapchain support ({} formats, {} present modes)",
            device_name,
            formats.len(),
            present_modes.len()
        );
        return None;
    }

    Some(PhysicalDeviceInfo {
        device,
        properties,
        memory_properties,
        queue_families,
    })
}

/// Picks graphics and present families.
///
/// A single family that does both is preferred, so submissions and
/// presentation share one queue whenever the hardware allows it.
pub fn find_queue_families(
    families: &[vk::QueueFamilyProperties],
    supports_present: impl Fn(u32) -> bool,
) -> QueueFamilyIndices {
    let mut indices = QueueFamilyIndices::default();

    for (i, family) in families.iter().enumerate() {
        let i = i as u32;

        if family.queue_count == 0 {
            continue;
        }

        let has_graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
        let has_present = supports_present(i);

        if has_graphics && has_present {
            return QueueFamilyIndices {
                graphics_family: Some(i),
                present_family: Some(i),
            };
        }

        if has_graphics && indices.graphics_family.is_none() {
            indices.graphics_family = Some(i);
        }
        if has_present && indices.present_family.is_none() {
            indices.present_family = Some(i);
        }
    }

    indices
}

/// Whether every name in `required` appears in `available`.
pub fn supports_extensions(available: &[vk::ExtensionProperties], required: &[&CStr]) -> bool {
    required.iter().all(|name| {
        available
            .iter()
            .any(|ext| ext.extension_name_as_c_str().is_ok_and(|n| n == *name))
    })
}

/// Scores a qualifying device. Higher is better.
pub fn rate_device(info: &PhysicalDeviceInfo) -> u32 {
    let mut score = match info.properties.device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 10000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1000,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 100,
        vk::PhysicalDeviceType::CPU => 10,
        _ => 1,
    };

    score += info.properties.limits.max_image_dimension2_d;

    // VRAM in MB, capped at 16GB
    let vram_mb = (info.device_local_memory() / (1024 * 1024)) as u32;
    score += vram_mb.min(16000);

    score
}
