use crate::models::audio_models::ChannelLevels;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordedFile, StreamChunk};
use crate::models::state::CaptureState;

/// Event delegate for capture session notifications.
///
/// When a session runs on a `SessionWorker`, every method is called from the
/// worker thread, not the UI thread. Implementations should marshal to the
/// UI thread if needed. All methods default to no-ops.
pub trait SessionDelegate: Send + Sync {
    /// Called after every state transition.
    fn on_state_changed(&self, _state: CaptureState) {}

    /// Called when a block is dropped as malformed or over the buffer limit.
    fn on_block_rejected(&self, _error: &CaptureError) {}

    /// Called with per-channel levels after each accepted block.
    fn on_levels_updated(&self, _levels: &[ChannelLevels]) {}

    /// Called when `stop()` has produced a complete file.
    fn on_file_ready(&self, _file: &RecordedFile) {}

    /// Called for every streaming chunk exported.
    fn on_stream_chunk(&self, _chunk: &StreamChunk) {}
}
