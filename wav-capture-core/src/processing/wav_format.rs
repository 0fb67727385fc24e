//! WAV file format utilities.
//!
//! Generates standard 44-byte RIFF WAV headers for 16-bit PCM, quantizes
//! float samples, and parses headers back for verification.

use crate::models::config::MAX_CHANNELS;
use crate::models::error::CaptureError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Bits per sample of every encoded file.
pub const BITS_PER_SAMPLE: u16 = 16;

const BYTES_PER_SAMPLE: usize = (BITS_PER_SAMPLE / 8) as usize;

/// Largest payload whose RIFF chunk size (`36 + data`) still fits in 32 bits.
pub const MAX_DATA_SIZE: usize = (u32::MAX - 36) as usize;

/// Generate a 44-byte WAV RIFF header for 16-bit PCM.
///
/// Every field is derived from the three arguments; the RIFF chunk size is
/// written once, as `36 + data_size`. Fails if `byte_rate`, `block_align` or
/// the chunk size does not fit its header field.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * 2
/// [32-33]  block_align = channels * 2
/// [34-35]  16
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(
    sample_rate: u32,
    channels: u16,
    data_size: u32,
) -> Result<[u8; WAV_HEADER_SIZE], CaptureError> {
    let block_align = block_align(channels)?;
    let byte_rate = byte_rate(sample_rate, channels)?;
    let chunk_size = data_size.checked_add(36).ok_or_else(|| {
        CaptureError::EncodingFailed(format!("{} bytes of PCM exceed the RIFF size limit", data_size))
    })?;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes()); // PCM format size
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM format code
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    Ok(header)
}

/// `channels * 2`, the size of one interleaved frame in bytes.
pub fn block_align(channels: u16) -> Result<u16, CaptureError> {
    channels
        .checked_mul(BYTES_PER_SAMPLE as u16)
        .ok_or_else(|| CaptureError::EncodingFailed(format!("block align overflows for {} channels", channels)))
}

/// `sample_rate * channels * 2`, checked against the 32-bit header field.
pub fn byte_rate(sample_rate: u32, channels: u16) -> Result<u32, CaptureError> {
    let align = block_align(channels)?;
    sample_rate.checked_mul(align as u32).ok_or_else(|| {
        CaptureError::EncodingFailed(format!(
            "byte rate of {} Hz x {} channels does not fit a WAV header",
            sample_rate, channels
        ))
    })
}

/// Quantize one float sample to signed 16-bit.
///
/// Clamps to `[-1.0, 1.0]`, then scales negatives by 32768 and positives by
/// 32767 so both extremes map onto the full i16 range.
pub fn quantize_sample(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Convert f32 samples to 16-bit little-endian PCM bytes.
///
/// Output length = `samples.len() * 2` bytes.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for &sample in samples {
        data.extend_from_slice(&quantize_sample(sample).to_le_bytes());
    }
    data
}

/// Encode interleaved samples as a complete WAV file.
///
/// `interleaved.len()` must be a multiple of `channels`; a trailing partial
/// frame is dropped so the payload always matches `block_align`.
pub fn encode_wav(interleaved: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>, CaptureError> {
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(CaptureError::EncodingFailed(format!("unsupported channel count: {}", channels)));
    }
    let whole_frames = interleaved.len() / channels as usize * channels as usize;
    let samples = &interleaved[..whole_frames];

    let data_size = samples.len() * BYTES_PER_SAMPLE;
    if data_size > MAX_DATA_SIZE {
        return Err(CaptureError::EncodingFailed(format!(
            "{} bytes of PCM exceed the RIFF size limit",
            data_size
        )));
    }

    let header = generate_wav_header(sample_rate, channels, data_size as u32)?;
    let mut bytes = Vec::with_capacity(WAV_HEADER_SIZE + data_size);
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(&encode_pcm16(samples));
    Ok(bytes)
}

/// Fields read back from a canonical 44-byte header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub chunk_size: u32,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavInfo {
    /// Frames described by the header (`data_size / block_align`).
    pub fn frames(&self) -> usize {
        if self.block_align == 0 {
            return 0;
        }
        self.data_size as usize / self.block_align as usize
    }
}

/// Parse and sanity-check a canonical 16-bit PCM WAV header.
///
/// Fails if the magic values are wrong, the format is not 16-bit PCM, the
/// derived fields disagree, or the buffer is shorter than the header claims.
pub fn parse_wav_header(bytes: &[u8]) -> Result<WavInfo, CaptureError> {
    if bytes.len() < WAV_HEADER_SIZE {
        return Err(CaptureError::EncodingFailed(format!(
            "buffer of {} bytes is shorter than a WAV header",
            bytes.len()
        )));
    }
    let u16_at = |offset: usize| u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
    let u32_at = |offset: usize| {
        u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
    };

    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" || &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
        return Err(CaptureError::EncodingFailed("missing RIFF/WAVE chunk identifiers".into()));
    }
    if u32_at(16) != 16 || u16_at(20) != 1 {
        return Err(CaptureError::EncodingFailed("not a PCM fmt chunk".into()));
    }

    let info = WavInfo {
        chunk_size: u32_at(4),
        channels: u16_at(22),
        sample_rate: u32_at(24),
        byte_rate: u32_at(28),
        block_align: u16_at(32),
        bits_per_sample: u16_at(34),
        data_size: u32_at(40),
    };

    if info.bits_per_sample != BITS_PER_SAMPLE {
        return Err(CaptureError::EncodingFailed(format!(
            "unsupported bit depth: {}",
            info.bits_per_sample
        )));
    }
    if info.chunk_size != info.data_size.wrapping_add(36) {
        return Err(CaptureError::EncodingFailed(format!(
            "RIFF chunk size {} disagrees with data size {}",
            info.chunk_size, info.data_size
        )));
    }
    if info.channels.checked_mul(2) != Some(info.block_align)
        || info.sample_rate.checked_mul(info.block_align as u32) != Some(info.byte_rate)
    {
        return Err(CaptureError::EncodingFailed("inconsistent fmt chunk".into()));
    }
    if bytes.len() - WAV_HEADER_SIZE < info.data_size as usize {
        return Err(CaptureError::EncodingFailed(format!(
            "header declares {} data bytes but only {} follow",
            info.data_size,
            bytes.len() - WAV_HEADER_SIZE
        )));
    }
    Ok(info)
}

/// Decode little-endian 16-bit PCM bytes. A trailing odd byte is ignored.
pub fn decode_pcm16(payload: &[u8]) -> Vec<i16> {
    payload
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
