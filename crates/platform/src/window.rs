//! Window wrapper and Vulkan surface creation.

use std::ffi::c_char;
use std::sync::Arc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes};

use vkframe_core::config::WindowConfig;
use vkframe_core::{Error, Result};

use crate::extent::SurfaceExtent;

/// Vulkan surface for a window.
///
/// Must be dropped before the instance it was created from and before the
/// window it presents to.
pub struct Surface {
    handle: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: created by ash_window::create_surface with this loader's instance,
        // destroyed only here.
        unsafe {
            self.surface_loader.destroy_surface(self.handle, None);
        }
        debug!("Vulkan surface destroyed");
    }
}

/// Application window.
pub struct Window {
    window: Arc<WinitWindow>,
}

impl Window {
    /// Creates a window from configuration.
    pub fn new(event_loop: &ActiveEventLoop, config: &WindowConfig) -> Result<Self> {
        let attrs = WindowAttributes::default()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| Error::Window(e.to_string()))?;

        info!("Window created: {}x{}", config.width, config.height);

        Ok(Self {
            window: Arc::new(window),
        })
    }

    /// Current drawable size in physical pixels.
    pub fn framebuffer_extent(&self) -> SurfaceExtent {
        self.window.inner_size().into()
    }

    /// Instance extensions needed to create a surface for this window.
    pub fn required_extensions(&self) -> Result<&'static [*const c_char]> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;

        let extensions = ash_window::enumerate_required_extensions(display_handle.as_raw())
            .map_err(|e| {
                Error::Vulkan(format!("Failed to enumerate required extensions: {}", e))
            })?;

        debug!(
            "Required Vulkan extensions for surface: {:?}",
            extensions
                .iter()
                // SAFETY: ash_window returns pointers to static NUL-terminated names.
                .map(|&ext| unsafe { std::ffi::CStr::from_ptr(ext) })
                .collect::<Vec<_>>()
        );

        Ok(extensions)
    }

    /// Creates a Vulkan surface for this window.
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;

        let window_handle = self
            .window
            .window_handle()
            .map_err(|e| Error::Window(format!("Failed to get window handle: {}", e)))?;

        // SAFETY: entry and instance are valid; the handles come from a live winit window.
        // The surface is destroyed in Surface::drop.
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| Error::Vulkan(format!("Failed to create Vulkan surface: {}", e)))?
        };

        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        info!("Vulkan surface created");

        Ok(Surface {
            handle,
            surface_loader,
        })
    }
}
