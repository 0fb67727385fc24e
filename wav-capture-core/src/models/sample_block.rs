use super::error::BlockRejection;

/// One delivery unit from a capture device: one `Vec<f32>` per channel.
///
/// All channels carry the same number of samples. Blocks are ordered by
/// arrival; they carry no timestamp of their own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleBlock {
    channels: Vec<Vec<f32>>,
}

impl SampleBlock {
    pub fn new(channels: Vec<Vec<f32>>) -> Self {
        Self { channels }
    }

    pub fn mono(samples: Vec<f32>) -> Self {
        Self {
            channels: vec![samples],
        }
    }

    /// Split interleaved `[L0, R0, L1, R1, ...]` samples into channels.
    ///
    /// A trailing partial frame is discarded.
    pub fn from_interleaved(samples: &[f32], channel_count: usize) -> Self {
        if channel_count == 0 {
            return Self::default();
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel (length of the first channel).
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Check the block against the session's channel count.
    ///
    /// Rejects mismatched channel counts, channels of unequal length and
    /// NaN or infinite samples.
    pub fn validate(&self, expected_channels: u16) -> Result<(), BlockRejection> {
        if self.channels.len() != expected_channels as usize {
            return Err(BlockRejection::ChannelMismatch {
                expected: expected_channels,
                actual: self.channels.len(),
            });
        }

        let frames = self.frames();
        for (channel, samples) in self.channels.iter().enumerate() {
            if samples.len() != frames {
                return Err(BlockRejection::RaggedChannels {
                    channel,
                    expected: frames,
                    actual: samples.len(),
                });
            }
            if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
                return Err(BlockRejection::NonFiniteSample { channel, index });
            }
        }
        Ok(())
    }
}
