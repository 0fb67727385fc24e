use serde::{Deserialize, Serialize};

use super::error::CaptureError;
use crate::processing::wav_format;

/// Highest channel count a session accepts.
pub const MAX_CHANNELS: u16 = 8;

/// Payload layout of streaming chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkFormat {
    /// Each chunk is a standalone WAV file (44-byte header + PCM).
    #[default]
    Wav,
    /// Each chunk is bare interleaved 16-bit little-endian PCM.
    RawPcm,
}

/// Streaming export settings. Present only when streaming is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamingConfig {
    #[serde(default)]
    pub format: ChunkFormat,
}

/// What to do when a channel reaches `max_buffer_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the oldest buffered samples to make room.
    #[default]
    DropOldest,
    /// Refuse the incoming block and keep what is buffered.
    Reject,
}

/// Configuration for a capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Rate the capture device delivers samples at, in Hz (default: 48000).
    pub native_sample_rate: u32,

    /// Rate of the exported WAV, in Hz (default: 16000). Must not exceed the native rate.
    pub target_sample_rate: u32,

    /// Number of channels per block (default: 1).
    pub channels: u16,

    /// Streaming export settings, or None for stop-only export.
    pub streaming: Option<StreamingConfig>,

    /// Per-channel buffer cap in seconds of native audio (None = unlimited).
    pub max_buffer_secs: Option<f64>,

    /// Applied once `max_buffer_secs` is reached.
    pub overflow_policy: OverflowPolicy,

    /// Prefix of generated file names (`{prefix}_{uuid}.wav`).
    pub file_prefix: String,
}

impl SessionConfig {
    /// Stop-only configuration for the given rates and channel count.
    pub fn new(native_sample_rate: u32, target_sample_rate: u32, channels: u16) -> Self {
        Self {
            native_sample_rate,
            target_sample_rate,
            channels,
            ..Default::default()
        }
    }

    /// Enable streaming export with the given chunk format.
    pub fn with_streaming(mut self, format: ChunkFormat) -> Self {
        self.streaming = Some(StreamingConfig { format });
        self
    }

    /// Cap each channel's buffer.
    pub fn with_buffer_limit(mut self, max_buffer_secs: f64, policy: OverflowPolicy) -> Self {
        self.max_buffer_secs = Some(max_buffer_secs);
        self.overflow_policy = policy;
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.native_sample_rate == 0 || self.target_sample_rate == 0 {
            return Err(CaptureError::ConfigurationFailed("sample rates must be positive".into()));
        }
        if self.native_sample_rate < self.target_sample_rate {
            return Err(CaptureError::ConfigurationFailed(format!(
                "upsampling is not supported: native {} Hz < target {} Hz",
                self.native_sample_rate, self.target_sample_rate
            )));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(CaptureError::ConfigurationFailed(format!(
                "unsupported channel count: {}",
                self.channels
            )));
        }
        for rate in [self.native_sample_rate, self.target_sample_rate] {
            if wav_format::byte_rate(rate, self.channels).is_err() {
                return Err(CaptureError::ConfigurationFailed(format!(
                    "{} Hz x {} channels overflows the WAV byte rate field",
                    rate, self.channels
                )));
            }
        }
        if let Some(secs) = self.max_buffer_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(CaptureError::ConfigurationFailed(format!(
                    "buffer limit must be a positive number of seconds, got {}",
                    secs
                )));
            }
        }
        Ok(())
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Per-channel sample cap derived from `max_buffer_secs`, at least one sample.
    pub fn buffer_limit_samples(&self) -> Option<usize> {
        self.max_buffer_secs
            .map(|secs| ((secs * self.native_sample_rate as f64) as usize).max(1))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            native_sample_rate: 48000,
            target_sample_rate: 16000,
            channels: 1,
            streaming: None,
            max_buffer_secs: None,
            overflow_policy: OverflowPolicy::DropOldest,
            file_prefix: "recording".into(),
        }
    }
}
