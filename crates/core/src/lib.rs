//! Core utilities shared by the vkframe crates.
//!
//! This crate provides:
//! - Error types and result aliases
//! - Logging initialization
//! - TOML configuration
//! - Frame-rate accounting

pub mod config;
mod error;
mod logging;
mod timer;

pub use config::{AppConfig, Config, ConfigError};
pub use error::{Error, Result};
pub use logging::{DEFAULT_LOG_FILTER, init_logging};
pub use timer::{FrameRate, FrameTimer};
