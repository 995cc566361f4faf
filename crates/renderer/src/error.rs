//! Frame scheduling errors.

use thiserror::Error;

use vkframe_rhi::RhiError;

/// Step of the per-frame tick that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameStage {
    WaitFence,
    ResetFence,
    Acquire,
    Record,
    Submit,
    Present,
    Recreate,
    WaitIdle,
}

impl FrameStage {
    pub fn name(self) -> &'static str {
        match self {
            FrameStage::WaitFence => "fence wait",
            FrameStage::ResetFence => "fence reset",
            FrameStage::Acquire => "image acquisition",
            FrameStage::Record => "command recording",
            FrameStage::Submit => "queue submission",
            FrameStage::Present => "presentation",
            FrameStage::Recreate => "surface recreation",
            FrameStage::WaitIdle => "device idle wait",
        }
    }
}

impl std::fmt::Display for FrameStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecoverable scheduler failure.
///
/// A stale surface is never reported here; it is handled by recreating the
/// surface inside the tick.
#[derive(Error, Debug)]
pub enum FrameError {
    /// Creating a slot primitive, the command pool or command buffers failed.
    #[error("Frame scheduler setup failed: {0}")]
    Setup(#[source] RhiError),

    /// A tick step failed for a reason other than staleness.
    #[error("Frame {stage} failed: {source}")]
    Fatal {
        stage: FrameStage,
        #[source]
        source: RhiError,
    },

    /// Rejected before any GPU object was created.
    #[error("Frames in flight must be at least 1, got {0}")]
    InvalidFramesInFlight(usize),
}

impl FrameError {
    /// Adapter for `map_err` that tags an RHI error with its stage.
    pub(crate) fn at(stage: FrameStage) -> impl FnOnce(RhiError) -> FrameError {
        move |source| FrameError::Fatal { stage, source }
    }

    /// Stage that failed, for tick errors.
    pub fn stage(&self) -> Option<FrameStage> {
        match self {
            FrameError::Fatal { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type alias for scheduler operations.
pub type FrameResult<T> = std::result::Result<T, FrameError>;
