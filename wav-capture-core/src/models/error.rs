use thiserror::Error;

use super::state::CaptureState;

/// Errors that can occur while capturing and encoding audio.
///
/// Every variant is recoverable from the session's point of view: the
/// session state is left untouched and the caller decides what to surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("malformed block dropped: {0}")]
    MalformedBlock(BlockRejection),

    #[error("cannot {action} while {from}")]
    InvalidTransition {
        action: &'static str,
        from: CaptureState,
    },

    #[error("streaming export is not enabled for this session")]
    StreamingDisabled,

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("session worker is no longer running")]
    SessionClosed,

    #[error("session worker failed: {0}")]
    WorkerFailed(String),
}

/// Why a single `SampleBlock` was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockRejection {
    #[error("expected {expected} channels, got {actual}")]
    ChannelMismatch { expected: u16, actual: usize },

    #[error("channel {channel} has {actual} samples, expected {expected}")]
    RaggedChannels {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    #[error("non-finite sample at channel {channel}, index {index}")]
    NonFiniteSample { channel: usize, index: usize },

    #[error("buffer limit of {limit} samples per channel reached")]
    BufferFull { limit: usize },
}

impl From<BlockRejection> for CaptureError {
    fn from(rejection: BlockRejection) -> Self {
        Self::MalformedBlock(rejection)
    }
}
