use serde::{Deserialize, Serialize};

/// Real-time level metering for one channel (RMS and peak, 0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelLevels {
    pub rms: f32,
    pub peak: f32,
}

/// Counters for debugging capture sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDiagnostics {
    pub blocks_accepted: u64,
    pub blocks_ignored: u64,
    pub blocks_rejected: u64,
    /// Frames appended per channel since the session was created.
    pub frames_accumulated: u64,
    /// Frames discarded by the drop-oldest overflow policy.
    pub frames_dropped: u64,
    pub files_exported: u64,
    pub stream_chunks_exported: u64,
    pub bytes_encoded: u64,
}
