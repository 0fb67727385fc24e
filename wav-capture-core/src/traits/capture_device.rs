use std::sync::Arc;

use crate::models::config::SessionConfig;
use crate::models::error::CaptureError;
use crate::models::sample_block::SampleBlock;

/// Callback invoked for every block a device captures.
///
/// Blocks are delivered one at a time, in capture order, on the device's
/// own thread.
pub type BlockCallback = Arc<dyn Fn(SampleBlock) + Send + Sync + 'static>;

/// Interface for the audio source feeding a capture session.
///
/// The pipeline never talks to a platform API directly; a backend wraps its
/// capture stream in this trait and hands channel-separated `f32` blocks to
/// the callback at a fixed block size and native sample rate.
pub trait CaptureDevice: Send {
    /// Whether this capture source is currently available.
    fn is_available(&self) -> bool;

    /// Rate at which blocks are delivered, in Hz.
    fn native_sample_rate(&self) -> u32;

    /// Channels per delivered block.
    fn channel_count(&self) -> u16;

    /// Start capturing, delivering blocks via `callback`.
    ///
    /// The callback fires on a dedicated audio thread, so it must stay cheap.
    fn start(&mut self, callback: BlockCallback) -> Result<(), CaptureError>;

    /// Stop capturing and release resources.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Session configuration matching this device's block format.
    fn session_config(&self, target_sample_rate: u32) -> SessionConfig {
        SessionConfig::new(self.native_sample_rate(), target_sample_rate, self.channel_count())
    }
}
