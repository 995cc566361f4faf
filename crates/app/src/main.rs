//! vkframe - windowed triangle driven by the frame scheduler.
//!
//! Usage: `vkframe [config.toml]`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use vkframe_core::{AppConfig, FrameTimer, init_logging};
use vkframe_platform::{ExtentSource, WindowHost};
use vkframe_renderer::{FrameOutcome, Renderer};

fn main() -> Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::discover(config_path.as_deref()).context("loading configuration")?;

    init_logging(config.logging.filter.as_deref());
    info!("Starting vkframe");

    let mut host = WindowHost::new(&config.window).context("creating window")?;
    let mut renderer =
        Renderer::new(&config, host.window()?).context("initializing renderer")?;

    let result = run(&config, &mut host, &mut renderer);
    info!(
        "Submitted {} frames",
        renderer.scheduler().frame_number()
    );

    // The swapchain and surface must go before the window.
    drop(renderer);
    host.close();

    if let Err(e) = &result {
        error!("Exiting after error: {:#}", e);
    } else {
        info!("Shut down cleanly");
    }
    result
}

fn run(config: &AppConfig, host: &mut WindowHost, renderer: &mut Renderer) -> Result<()> {
    let interval = Duration::try_from_secs_f32(config.frames.stats_interval_secs)
        .context("frames.stats_interval_secs")?;
    let mut timer = FrameTimer::new(interval);

    info!("Initialization complete, entering main loop");

    loop {
        host.poll_events();
        if host.close_requested() {
            info!("Close requested, shutting down");
            return Ok(());
        }

        if host.take_resized() {
            renderer.resize();
        }

        match renderer.draw_frame(host).context("drawing frame")? {
            FrameOutcome::Deferred => {
                info!("Window closed while minimized");
                return Ok(());
            }
            outcome if outcome.presented() => {
                if let Some(rate) = timer.frame_presented() {
                    debug!(
                        "{:.1} fps ({:.2} ms/frame, {} frames total)",
                        rate.fps,
                        rate.frame_ms,
                        timer.total_frames()
                    );
                }
            }
            FrameOutcome::SkippedStale => debug!("Frame skipped, swapchain rebuilt"),
            _ => {}
        }
    }
}
