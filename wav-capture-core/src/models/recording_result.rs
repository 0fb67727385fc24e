use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::config::ChunkFormat;
use crate::processing::wav_format::WAV_HEADER_SIZE;

/// MIME type of every exported file.
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// A complete WAV file produced by `stop()`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFile {
    pub metadata: RecordingMetadata,
    pub bytes: Vec<u8>,
}

impl RecordedFile {
    /// Wrap encoded WAV bytes, stamping a fresh id, timestamp and checksum.
    pub fn new(file_prefix: &str, bytes: Vec<u8>, sample_rate: u32, channels: u16, frames: usize) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let duration_secs = if sample_rate == 0 {
            0.0
        } else {
            frames as f64 / sample_rate as f64
        };
        let metadata = RecordingMetadata {
            file_name: format!("{}_{}.wav", file_prefix, id),
            id,
            mime_type: WAV_MIME_TYPE.to_string(),
            sample_rate,
            channels,
            frames: frames as u64,
            duration_secs,
            byte_length: bytes.len() as u64,
            checksum: sha256_hex(&bytes),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        Self { metadata, bytes }
    }

    pub fn mime_type(&self) -> &str {
        &self.metadata.mime_type
    }

    pub fn file_name(&self) -> &str {
        &self.metadata.file_name
    }

    /// PCM payload following the 44-byte header.
    pub fn payload(&self) -> &[u8] {
        self.bytes.get(WAV_HEADER_SIZE..).unwrap_or(&[])
    }

    /// True when the file carries a header but no audio.
    pub fn is_empty(&self) -> bool {
        self.metadata.frames == 0
    }
}

/// Everything about a recorded file except its bytes.
///
/// Serializable so the control layer can forward it alongside an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames at the exported (target) rate.
    pub frames: u64,
    pub duration_secs: f64,
    pub byte_length: u64,
    /// SHA-256 of the complete file, lowercase hex.
    pub checksum: String,
    pub created_at: String,
}

impl RecordingMetadata {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Incremental payload produced by `export_streaming_chunk()`.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChunk {
    /// Zero-based position of this chunk within the take.
    pub sequence: u64,
    /// Index of the first target-rate frame in this chunk.
    pub start_frame: u64,
    /// Frames at the target rate contained in this chunk.
    pub frames: usize,
    pub format: ChunkFormat,
    pub bytes: Vec<u8>,
}

impl StreamChunk {
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }
}

/// SHA-256 hex digest of a byte buffer.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
