//! Logging initialization and configuration.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter used when neither `RUST_LOG` nor the configuration provide one.
pub const DEFAULT_LOG_FILTER: &str = "info,vkframe=debug";

/// Initialize the logging system with tracing.
///
/// `RUST_LOG` always wins. Otherwise `directive` is used, falling back to
/// [`DEFAULT_LOG_FILTER`] when it is `None` or does not parse.
///
/// # Example
/// ```
/// vkframe_core::init_logging(Some("info"));
/// tracing::info!("Scheduler starting");
/// ```
pub fn init_logging(directive: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback_filter(directive));

    // A second init (e.g. from several doctests in one process) is not an error.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init();
}

fn fallback_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}
