use crate::models::error::CaptureError;
use crate::processing::wav_format;

/// Block-average decimating resampler.
///
/// Each output sample is the arithmetic mean of the contiguous run of input
/// samples it covers. Averaging is a crude low-pass, not a sinc filter:
/// content above the target Nyquist frequency is attenuated, not removed.
/// Upsampling is not supported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resampler {
    native_sample_rate: u32,
    target_sample_rate: u32,
    ratio: f64,
}

impl Resampler {
    pub fn new(native_sample_rate: u32, target_sample_rate: u32) -> Result<Self, CaptureError> {
        if native_sample_rate == 0 || target_sample_rate == 0 {
            return Err(CaptureError::ConfigurationFailed("sample rates must be positive".into()));
        }
        if native_sample_rate < target_sample_rate {
            return Err(CaptureError::ConfigurationFailed(format!(
                "cannot upsample from {} Hz to {} Hz",
                native_sample_rate, target_sample_rate
            )));
        }
        // Even a mono file at either rate must have a representable byte rate.
        for rate in [native_sample_rate, target_sample_rate] {
            if wav_format::byte_rate(rate, 1).is_err() {
                return Err(CaptureError::ConfigurationFailed(format!("sample rate {} Hz is too high", rate)));
            }
        }
        Ok(Self {
            native_sample_rate,
            target_sample_rate,
            ratio: native_sample_rate as f64 / target_sample_rate as f64,
        })
    }

    /// `native / target`, always >= 1.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn native_sample_rate(&self) -> u32 {
        self.native_sample_rate
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    pub fn is_passthrough(&self) -> bool {
        self.native_sample_rate == self.target_sample_rate
    }

    /// Number of output samples produced for `input_len` input samples.
    pub fn output_len(&self, input_len: usize) -> usize {
        if self.is_passthrough() {
            return input_len;
        }
        self.output_len_u128(input_len as u128) as usize
    }

    // round(n / r) with r = native / target, rounding halves up
    fn output_len_u128(&self, input_len: u128) -> u128 {
        let native = self.native_sample_rate as u128;
        let target = self.target_sample_rate as u128;
        (2 * input_len * target + native) / (2 * native)
    }

    /// `floor(index * r)`: the input position where output `index` starts.
    fn window_start(&self, index: u128) -> u128 {
        index * self.native_sample_rate as u128 / self.target_sample_rate as u128
    }

    /// Resample one channel from the native rate to the target rate.
    ///
    /// Returns the input unchanged if the rates match, and an empty vector
    /// if the input is too short to yield a single output sample.
    pub fn resample(&self, samples: &[f32]) -> Vec<f32> {
        if self.is_passthrough() {
            return samples.to_vec();
        }

        let output_count = self.output_len(samples.len());
        let mut output = Vec::with_capacity(output_count);
        let mut offset = 0usize;
        for i in 0..output_count {
            // Exact integer boundaries: windows are contiguous and never drift.
            let next_offset = self.window_start(i as u128 + 1) as usize;
            let end = next_offset.min(samples.len());
            output.push(window_mean(&samples[offset..end]));
            offset = next_offset;
        }
        output
    }

    /// Resample the next stretch of a signal delivered in pieces.
    ///
    /// `samples` must begin at the input position where output `first_output`
    /// starts, i.e. right after everything consumed by earlier calls. Only
    /// windows that are complete and inside `round(n / r)` for the input seen
    /// so far are emitted. Returns the outputs and the number of input samples
    /// they consumed; the rest belongs at the front of the next call.
    ///
    /// Concatenated outputs equal a prefix of `resample` over the whole signal
    /// and fall short of it by at most its trailing partial window.
    pub fn resample_continuing(&self, samples: &[f32], first_output: u64) -> (Vec<f32>, usize) {
        if self.is_passthrough() {
            return (samples.to_vec(), samples.len());
        }

        let native = self.native_sample_rate as u128;
        let target = self.target_sample_rate as u128;
        let first = first_output as u128;
        let base = self.window_start(first);
        let available = base + samples.len() as u128;

        // Largest k with window_start(k) <= available: every window below k is complete.
        let complete = ((available + 1) * target - 1) / native;
        let end_output = complete.min(self.output_len_u128(available));

        let mut output = Vec::with_capacity(end_output.saturating_sub(first) as usize);
        let mut offset = 0usize;
        for i in first..end_output {
            let next_offset = (self.window_start(i + 1) - base) as usize;
            output.push(window_mean(&samples[offset..next_offset]));
            offset = next_offset;
        }
        (output, offset)
    }
}

/// Mean of one decimation window, accumulated in f64.
fn window_mean(window: &[f32]) -> f32 {
    // r >= 1 and i < round(n / r) put every window start inside the input.
    debug_assert!(!window.is_empty(), "decimation window must not be empty");
    let sum: f64 = window.iter().map(|&s| s as f64).sum();
    (sum / window.len() as f64) as f32
}

/// Resample `samples` from `native_sample_rate` to `target_sample_rate`.
pub fn resample(samples: &[f32], native_sample_rate: u32, target_sample_rate: u32) -> Result<Vec<f32>, CaptureError> {
    Ok(Resampler::new(native_sample_rate, target_sample_rate)?.resample(samples))
}

/// Interleave per-channel samples into `[c0_0, c1_0, ..., c0_1, c1_1, ...]`.
///
/// The frame count is that of the shortest channel.
pub fn interleave(channels: &[Vec<f32>]) -> Vec<f32> {
    let Some(frame_count) = channels.iter().map(Vec::len).min() else {
        return Vec::new();
    };
    if channels.len() == 1 {
        return channels[0].clone();
    }

    let mut interleaved = Vec::with_capacity(frame_count * channels.len());
    for i in 0..frame_count {
        for channel in channels {
            interleaved.push(channel[i]);
        }
    }
    interleaved
}

/// Compute RMS level of samples (0.0–1.0 range for normalized audio).
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Compute peak absolute level of samples.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}
