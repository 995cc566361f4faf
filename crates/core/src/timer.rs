//! Frame-rate accounting for the run loop.

use std::time::{Duration, Instant};

/// Frame rate measured over one reporting window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRate {
    /// Frames counted in the window.
    pub frames: u32,
    /// Frames per second over the window.
    pub fps: f32,
    /// Average wall time per frame, in milliseconds.
    pub frame_ms: f32,
}

/// Counts presented frames and reports a [`FrameRate`] once per interval.
#[derive(Debug)]
pub struct FrameTimer {
    interval: Duration,
    window_start: Instant,
    frames: u32,
    total_frames: u64,
}

impl FrameTimer {
    /// Create a timer that reports every `interval`, starting now.
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    fn starting_at(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            window_start: start,
            frames: 0,
            total_frames: 0,
        }
    }

    /// Record one presented frame.
    ///
    /// Returns the measured rate when the current window has elapsed.
    pub fn frame_presented(&mut self) -> Option<FrameRate> {
        self.frame_presented_at(Instant::now())
    }

    fn frame_presented_at(&mut self, now: Instant) -> Option<FrameRate> {
        self.frames += 1;
        self.total_frames += 1;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }

        let secs = elapsed.as_secs_f32();
        let rate = FrameRate {
            frames: self.frames,
            fps: self.frames as f32 / secs,
            frame_ms: secs * 1000.0 / self.frames as f32,
        };

        self.window_start = now;
        self.frames = 0;
        Some(rate)
    }

    /// Total frames recorded since creation.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}
