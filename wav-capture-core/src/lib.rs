//! # wav-capture-core
//!
//! Capture-to-WAV encoding pipeline.
//!
//! Raw per-channel `f32` blocks from a capture device are accumulated without
//! loss, decimated to a target sample rate by block averaging, and encoded as
//! 16-bit PCM WAV, either once on stop or incrementally as streaming chunks.
//! Backends implement the `CaptureDevice` trait and feed a `CaptureSession`,
//! usually through the command queue of a `SessionWorker`.
//!
//! ## Architecture
//!
//! ```text
//! wav-capture-core (this crate)
//! ├── traits/       ← CaptureDevice, SessionDelegate
//! ├── models/       ← CaptureError, CaptureState, SessionConfig, SampleBlock, RecordedFile, etc.
//! ├── processing/   ← ChannelAccumulator, Resampler, WAV encoding
//! └── session/      ← CaptureSession (state machine), SessionWorker / SessionHandle
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{ChannelLevels, SessionDiagnostics};
pub use models::config::{ChunkFormat, OverflowPolicy, SessionConfig, StreamingConfig};
pub use models::error::{BlockRejection, CaptureError};
pub use models::recording_result::{RecordedFile, RecordingMetadata, StreamChunk};
pub use models::sample_block::SampleBlock;
pub use models::state::CaptureState;
pub use processing::accumulator::ChannelAccumulator;
pub use processing::resampler::Resampler;
pub use session::capture::{CaptureSession, RecordOutcome};
pub use session::worker::{SessionHandle, SessionStatus, SessionWorker};
pub use traits::capture_device::{BlockCallback, CaptureDevice};
pub use traits::session_delegate::SessionDelegate;
