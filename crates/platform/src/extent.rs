//! Framebuffer extent as seen by the windowing layer.

/// Size of the drawable area in physical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SurfaceExtent {
    pub width: u32,
    pub height: u32,
}

impl SurfaceExtent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Either dimension is zero, e.g. while the window is minimized.
    ///
    /// No swapchain can be built for such an extent.
    #[inline]
    pub const fn is_zero_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for SurfaceExtent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for SurfaceExtent {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

impl From<SurfaceExtent> for ash::vk::Extent2D {
    fn from(extent: SurfaceExtent) -> Self {
        ash::vk::Extent2D {
            width: extent.width,
            height: extent.height,
        }
    }
}

impl From<ash::vk::Extent2D> for SurfaceExtent {
    fn from(extent: ash::vk::Extent2D) -> Self {
        Self::new(extent.width, extent.height)
    }
}

/// Windowing-layer services needed while rebuilding the presentation surface.
///
/// Surface recreation polls [`framebuffer_extent`](Self::framebuffer_extent)
/// and, while it is zero-area, blocks in [`wait_events`](Self::wait_events)
/// until the window is restored or closed.
pub trait ExtentSource {
    /// Current drawable size.
    fn framebuffer_extent(&self) -> SurfaceExtent;

    /// Blocks until at least one window event has been processed.
    fn wait_events(&mut self);

    /// The user asked to close the window.
    fn close_requested(&self) -> bool;
}
