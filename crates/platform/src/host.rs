//! Event-loop host for a single window.
//!
//! [`WindowHost`] owns the winit event loop and pumps it on demand instead of
//! handing control to `run_app`. The render loop calls
//! [`poll_events`](WindowHost::poll_events) once per frame, and surface
//! recreation calls [`wait_events`](ExtentSource::wait_events) to sleep while
//! the window is minimized.

use std::time::Duration;

use tracing::{debug, info, trace, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::WindowId;

use vkframe_core::config::WindowConfig;
use vkframe_core::{Error, Result};

use crate::extent::{ExtentSource, SurfaceExtent};
use crate::window::Window;

/// Pumps before giving up on the platform delivering `resumed`.
const MAX_STARTUP_PUMPS: usize = 100;

/// Window state distilled from winit events.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WindowEvents {
    resized: bool,
    last_size: Option<SurfaceExtent>,
    close_requested: bool,
}

impl WindowEvents {
    /// Folds one window event into the state.
    pub fn record(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => {
                let extent = SurfaceExtent::from(*size);
                trace!("Window resized to {}", extent);
                self.resized = true;
                self.last_size = Some(extent);
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                self.resized = true;
            }
            WindowEvent::CloseRequested => {
                info!("Window close requested");
                self.close_requested = true;
            }
            _ => {}
        }
    }

    /// Returns and clears the resize flag.
    pub fn take_resized(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }

    pub fn last_size(&self) -> Option<SurfaceExtent> {
        self.last_size
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }
}

struct HostState {
    config: WindowConfig,
    window: Option<Window>,
    events: WindowEvents,
    startup_error: Option<Error>,
    /// Sleep until the next event instead of polling.
    blocking: bool,
}

impl ApplicationHandler for HostState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match Window::new(event_loop, &self.config) {
            Ok(window) => self.window = Some(window),
            Err(e) => self.startup_error = Some(e),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.events.record(&event);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(if self.blocking {
            ControlFlow::Wait
        } else {
            ControlFlow::Poll
        });
    }
}

/// Owns the event loop and the window it creates.
pub struct WindowHost {
    state: HostState,
    event_loop: EventLoop<()>,
}

impl WindowHost {
    /// Creates the event loop and pumps it until the window exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the event loop or window cannot be created, or if
    /// the platform exits before delivering `resumed`.
    pub fn new(config: &WindowConfig) -> Result<Self> {
        let event_loop =
            EventLoop::new().map_err(|e| Error::Window(format!("Event loop: {}", e)))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut host = Self {
            state: HostState {
                config: config.clone(),
                window: None,
                events: WindowEvents::default(),
                startup_error: None,
                blocking: false,
            },
            event_loop,
        };

        for _ in 0..MAX_STARTUP_PUMPS {
            host.pump(Some(Duration::ZERO));

            if let Some(e) = host.state.startup_error.take() {
                return Err(e);
            }
            if host.state.window.is_some() {
                debug!("Window host ready");
                return Ok(host);
            }
            if host.state.events.close_requested() {
                break;
            }
        }

        Err(Error::Window(
            "event loop never delivered a resumed event".to_string(),
        ))
    }

    /// Processes pending events without blocking.
    pub fn poll_events(&mut self) {
        self.pump(Some(Duration::ZERO));
    }

    fn pump(&mut self, timeout: Option<Duration>) {
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(timeout, &mut self.state) {
            warn!("Event loop exited with code {}", code);
            self.state.events.close_requested = true;
        }
    }

    /// The window, created during startup.
    pub fn window(&self) -> Result<&Window> {
        self.state
            .window
            .as_ref()
            .ok_or_else(|| Error::Internal("window not created".to_string()))
    }

    /// Returns and clears the pending resize notification.
    pub fn take_resized(&mut self) -> bool {
        self.state.events.take_resized()
    }

    /// Drops the window. Call after every Vulkan object that uses it is gone.
    pub fn close(&mut self) {
        if self.state.window.take().is_some() {
            info!("Window closed");
        }
    }
}

impl ExtentSource for WindowHost {
    fn framebuffer_extent(&self) -> SurfaceExtent {
        match &self.state.window {
            Some(window) => window.framebuffer_extent(),
            None => self.state.events.last_size().unwrap_or_default(),
        }
    }

    fn wait_events(&mut self) {
        self.state.blocking = true;
        self.pump(None);
        self.state.blocking = false;
    }

    fn close_requested(&self) -> bool {
        self.state.events.close_requested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn test_resize_sets_flag_and_size() {
        let mut events = WindowEvents::default();
        events.record(&WindowEvent::Resized(PhysicalSize::new(640, 480)));

        assert_eq!(events.last_size(), Some(SurfaceExtent::new(640, 480)));
        assert!(events.take_resized());
        assert!(!events.take_resized());
    }

    #[test]
    fn test_minimize_records_zero_extent() {
        let mut events = WindowEvents::default();
        events.record(&WindowEvent::Resized(PhysicalSize::new(0, 0)));

        assert!(events.last_size().is_some_and(|e| e.is_zero_area()));
        assert!(events.take_resized());
    }

    #[test]
    fn test_close_requested_sticks() {
        let mut events = WindowEvents::default();
        assert!(!events.close_requested());

        events.record(&WindowEvent::CloseRequested);
        events.record(&WindowEvent::Focused(true));
        assert!(events.close_requested());
        assert!(!events.take_resized());
    }
}
