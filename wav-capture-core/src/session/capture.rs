use std::sync::Arc;

use crate::models::audio_models::{ChannelLevels, SessionDiagnostics};
use crate::models::config::{ChunkFormat, OverflowPolicy, SessionConfig};
use crate::models::error::{BlockRejection, CaptureError};
use crate::models::recording_result::{RecordedFile, StreamChunk};
use crate::models::sample_block::SampleBlock;
use crate::models::state::CaptureState;
use crate::processing::accumulator::ChannelAccumulator;
use crate::processing::resampler::{self, Resampler};
use crate::processing::wav_format::{self, MAX_DATA_SIZE};
use crate::traits::session_delegate::SessionDelegate;

/// What `record` did with a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The block was appended; `frames` samples per channel.
    Appended { frames: usize },
    /// The session is paused; the block was dropped on purpose.
    Ignored,
}

/// Capture-to-WAV session.
///
/// Owns one accumulator per channel and the record/pause flag. Data flow:
/// ```text
/// record(block) → [ChannelAccumulator × channels]
///                      │ stop()                   │ export_streaming_chunk()
///                      ↓ drain                    ↓ snapshot since cursor
///                 [Resampler] → interleave → wav_format → RecordedFile / StreamChunk
/// ```
///
/// All methods take `&mut self`; run the session on a `SessionWorker` to
/// drive it from several threads through a single ordered queue.
pub struct CaptureSession {
    config: Option<SessionConfig>,
    resampler: Option<Resampler>,
    state: CaptureState,
    accumulators: Vec<ChannelAccumulator>,
    // Per-channel position of the first sample not yet streamed.
    stream_cursors: Vec<usize>,
    stream_sequence: u64,
    stream_frames_emitted: u64,
    levels: Vec<ChannelLevels>,
    diagnostics: SessionDiagnostics,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            config: None,
            resampler: None,
            state: CaptureState::Idle,
            accumulators: Vec::new(),
            stream_cursors: Vec::new(),
            stream_sequence: 0,
            stream_frames_emitted: 0,
            levels: Vec::new(),
            diagnostics: SessionDiagnostics::default(),
            delegate: None,
        }
    }

    /// Create a session and configure it in one step.
    pub fn with_config(config: SessionConfig) -> Result<Self, CaptureError> {
        let mut session = Self::new();
        session.configure(config)?;
        Ok(session)
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    /// Levels of the most recently accepted block, one entry per channel.
    pub fn levels(&self) -> &[ChannelLevels] {
        &self.levels
    }

    pub fn diagnostics(&self) -> &SessionDiagnostics {
        &self.diagnostics
    }

    /// Frames (samples per channel) currently buffered at the native rate.
    pub fn buffered_frames(&self) -> usize {
        self.accumulators.first().map_or(0, ChannelAccumulator::len)
    }

    pub fn buffered_duration_secs(&self) -> f64 {
        match &self.config {
            Some(config) => self.buffered_frames() as f64 / config.native_sample_rate as f64,
            None => 0.0,
        }
    }

    /// Native-rate frames not yet consumed by a streaming export.
    pub fn pending_stream_frames(&self) -> usize {
        match (self.accumulators.first(), self.stream_cursors.first()) {
            (Some(acc), Some(&cursor)) => acc.len().saturating_sub(cursor),
            _ => 0,
        }
    }

    /// Apply configuration. Only allowed while idle.
    ///
    /// Rebuilds the accumulators and the resampler, so the channel count and
    /// rates may change between takes.
    pub fn configure(&mut self, config: SessionConfig) -> Result<(), CaptureError> {
        if !self.state.is_idle() {
            return Err(CaptureError::InvalidTransition {
                action: "configure",
                from: self.state,
            });
        }

        config.validate()?;
        let resampler = Resampler::new(config.native_sample_rate, config.target_sample_rate)?;

        let channels = config.channels as usize;
        self.accumulators = (0..channels)
            .map(|_| match config.buffer_limit_samples() {
                Some(limit) => ChannelAccumulator::with_limit(limit, config.overflow_policy),
                None => ChannelAccumulator::new(),
            })
            .collect();
        self.stream_cursors = vec![0; channels];
        self.stream_sequence = 0;
        self.stream_frames_emitted = 0;
        self.levels = vec![ChannelLevels::default(); channels];

        log::debug!(
            "configured capture session: {} Hz -> {} Hz, {} channel(s), streaming: {}",
            config.native_sample_rate,
            config.target_sample_rate,
            config.channels,
            config.is_streaming()
        );

        self.resampler = Some(resampler);
        self.config = Some(config);
        Ok(())
    }

    /// Start recording. Transitions: idle → recording.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.config.is_none() {
            return Err(CaptureError::ConfigurationFailed("session not configured".into()));
        }
        if !self.state.is_idle() {
            return Err(CaptureError::InvalidTransition {
                action: "start",
                from: self.state,
            });
        }
        self.set_state(CaptureState::Recording);
        Ok(())
    }

    /// Append one block while recording.
    ///
    /// Paused sessions ignore blocks. Malformed blocks are dropped whole,
    /// reported to the delegate and returned as `MalformedBlock`; the
    /// samples already buffered are never touched.
    pub fn record(&mut self, block: SampleBlock) -> Result<RecordOutcome, CaptureError> {
        let Some(config) = &self.config else {
            return Err(CaptureError::ConfigurationFailed("record called before configure".into()));
        };
        let expected_channels = config.channels;
        let policy = config.overflow_policy;

        match self.state {
            CaptureState::Idle => Err(CaptureError::ConfigurationFailed("record called before start".into())),
            CaptureState::Paused => {
                self.diagnostics.blocks_ignored += 1;
                Ok(RecordOutcome::Ignored)
            }
            CaptureState::Recording => {
                if let Err(rejection) = block.validate(expected_channels) {
                    return Err(self.reject_block(rejection));
                }

                let frames = block.frames();
                if policy == OverflowPolicy::Reject {
                    let full = self
                        .accumulators
                        .iter()
                        .find(|acc| acc.would_overflow(frames))
                        .and_then(ChannelAccumulator::limit);
                    if let Some(limit) = full {
                        return Err(self.reject_block(BlockRejection::BufferFull { limit }));
                    }
                }

                self.append_block(block);
                Ok(RecordOutcome::Appended { frames })
            }
        }
    }

    /// Pause recording. Transitions: recording → paused.
    pub fn pause(&mut self) -> Result<(), CaptureError> {
        if !self.state.is_recording() {
            return Err(CaptureError::InvalidTransition {
                action: "pause",
                from: self.state,
            });
        }
        self.set_state(CaptureState::Paused);
        Ok(())
    }

    /// Resume recording. Transitions: paused → recording.
    pub fn resume(&mut self) -> Result<(), CaptureError> {
        if !self.state.is_paused() {
            return Err(CaptureError::InvalidTransition {
                action: "resume",
                from: self.state,
            });
        }
        self.set_state(CaptureState::Recording);
        Ok(())
    }

    /// Stop recording and export everything buffered as one WAV file.
    /// Transitions: recording/paused → idle.
    ///
    /// Accumulators and streaming cursors are emptied. With nothing
    /// recorded the result is a valid header-only file.
    pub fn stop(&mut self) -> Result<RecordedFile, CaptureError> {
        if !self.state.is_active() {
            return Err(CaptureError::InvalidTransition {
                action: "stop",
                from: self.state,
            });
        }
        let (config, resampler) = self.configured()?;
        let channels = config.channels;
        let target_rate = config.target_sample_rate;
        let file_prefix = config.file_prefix.clone();

        check_payload_size(resampler.output_len(self.buffered_frames()), channels)?;

        let resampled: Vec<Vec<f32>> = self
            .accumulators
            .iter_mut()
            .map(|acc| resampler.resample(&acc.drain()))
            .collect();
        let interleaved = resampler::interleave(&resampled);
        let bytes = wav_format::encode_wav(&interleaved, target_rate, channels)?;
        let frames = interleaved.len() / channels as usize;

        if frames == 0 {
            log::warn!("exporting empty recording: no samples were captured");
        }

        let file = RecordedFile::new(&file_prefix, bytes, target_rate, channels, frames);
        log::debug!(
            "exported {} ({} frames, {} bytes)",
            file.file_name(),
            frames,
            file.bytes.len()
        );

        self.reset_stream();
        self.diagnostics.files_exported += 1;
        self.diagnostics.bytes_encoded += file.bytes.len() as u64;
        self.set_state(CaptureState::Idle);

        if let Some(ref delegate) = self.delegate {
            delegate.on_file_ready(&file);
        }
        Ok(file)
    }

    /// Encode only the samples accumulated since the previous call.
    ///
    /// Requires streaming mode and an active take. History is kept for the
    /// final `stop()` export; only the per-channel cursors advance. Window
    /// phase carries across chunks, so the joined chunks match the start of
    /// the `stop()` export. A trailing partial window is held back until
    /// enough samples arrive.
    pub fn export_streaming_chunk(&mut self) -> Result<StreamChunk, CaptureError> {
        let (config, resampler) = self.configured()?;
        let Some(streaming) = config.streaming else {
            return Err(CaptureError::StreamingDisabled);
        };
        if !self.state.is_active() {
            return Err(CaptureError::InvalidTransition {
                action: "export a streaming chunk",
                from: self.state,
            });
        }
        let channels = config.channels;
        let target_rate = config.target_sample_rate;

        check_payload_size(resampler.output_len(self.pending_stream_frames()), channels)?;

        let first_output = self.stream_frames_emitted;
        let mut consumed = 0;
        let resampled: Vec<Vec<f32>> = self
            .accumulators
            .iter()
            .zip(&self.stream_cursors)
            .map(|(acc, &cursor)| {
                let (output, used) = resampler.resample_continuing(&acc.snapshot_from(cursor), first_output);
                consumed = used;
                output
            })
            .collect();
        let interleaved = resampler::interleave(&resampled);
        let bytes = match streaming.format {
            ChunkFormat::Wav => wav_format::encode_wav(&interleaved, target_rate, channels)?,
            ChunkFormat::RawPcm => wav_format::encode_pcm16(&interleaved),
        };
        let frames = interleaved.len() / channels as usize;

        // Samples of a partial window stay pending for the next chunk.
        for cursor in &mut self.stream_cursors {
            *cursor += consumed;
        }

        let chunk = StreamChunk {
            sequence: self.stream_sequence,
            start_frame: self.stream_frames_emitted,
            frames,
            format: streaming.format,
            bytes,
        };
        self.stream_sequence += 1;
        self.stream_frames_emitted += frames as u64;
        self.diagnostics.stream_chunks_exported += 1;
        self.diagnostics.bytes_encoded += chunk.bytes.len() as u64;

        if let Some(ref delegate) = self.delegate {
            delegate.on_stream_chunk(&chunk);
        }
        Ok(chunk)
    }

    /// Discard everything buffered and return to idle. Never fails.
    ///
    /// Configuration is kept. Calling it repeatedly is the same as calling it once.
    pub fn clear(&mut self) {
        for acc in &mut self.accumulators {
            acc.clear();
        }
        self.reset_stream();
        for level in &mut self.levels {
            *level = ChannelLevels::default();
        }
        if !self.state.is_idle() {
            log::debug!("capture session cleared while {}", self.state);
            self.set_state(CaptureState::Idle);
        }
    }

    // --- Internal helpers ---

    fn configured(&self) -> Result<(&SessionConfig, Resampler), CaptureError> {
        match (&self.config, self.resampler) {
            (Some(config), Some(resampler)) => Ok((config, resampler)),
            _ => Err(CaptureError::ConfigurationFailed("session not configured".into())),
        }
    }

    fn set_state(&mut self, new_state: CaptureState) {
        if self.state == new_state {
            return;
        }
        log::debug!("capture session: {} -> {}", self.state, new_state);
        self.state = new_state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(new_state);
        }
    }

    fn reset_stream(&mut self) {
        for cursor in &mut self.stream_cursors {
            *cursor = 0;
        }
        self.stream_sequence = 0;
        self.stream_frames_emitted = 0;
    }

    fn reject_block(&mut self, rejection: BlockRejection) -> CaptureError {
        let error = CaptureError::MalformedBlock(rejection);
        self.diagnostics.blocks_rejected += 1;
        log::warn!("{}", error);
        if let Some(ref delegate) = self.delegate {
            delegate.on_block_rejected(&error);
        }
        error
    }

    /// Append a validated block to every channel and refresh levels.
    fn append_block(&mut self, block: SampleBlock) {
        let frames = block.frames();
        let mut dropped_frames = 0;

        for (index, samples) in block.into_channels().into_iter().enumerate() {
            self.levels[index] = ChannelLevels {
                rms: resampler::rms_level(&samples),
                peak: resampler::peak_level(&samples),
            };

            let dropped = self.accumulators[index].append(&samples);
            if dropped > 0 {
                // Dropped samples may include some not yet streamed.
                self.stream_cursors[index] = self.stream_cursors[index].saturating_sub(dropped);
                dropped_frames = dropped;
            }
        }

        if dropped_frames > 0 {
            log::warn!("buffer limit reached: dropped {} oldest frames", dropped_frames);
            self.diagnostics.frames_dropped += dropped_frames as u64;
        }
        self.diagnostics.blocks_accepted += 1;
        self.diagnostics.frames_accumulated += frames as u64;

        if let Some(ref delegate) = self.delegate {
            delegate.on_levels_updated(&self.levels);
        }
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Fail before draining anything if the payload would not fit a RIFF header.
fn check_payload_size(frames: usize, channels: u16) -> Result<(), CaptureError> {
    let data_size = frames.saturating_mul(channels as usize).saturating_mul(2);
    if data_size > MAX_DATA_SIZE {
        return Err(CaptureError::EncodingFailed(format!(
            "{} frames exceed the RIFF size limit",
            frames
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::wav_format::{decode_pcm16, parse_wav_header, WAV_HEADER_SIZE};
    use parking_lot::Mutex;

    fn recording(config: SessionConfig) -> CaptureSession {
        let mut session = CaptureSession::with_config(config).unwrap();
        session.start().unwrap();
        session
    }

    fn decode(bytes: &[u8]) -> Vec<i16> {
        decode_pcm16(&bytes[WAV_HEADER_SIZE..])
    }

    #[derive(Default)]
    struct EventLog {
        events: Mutex<Vec<String>>,
    }

    impl EventLog {
        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }
    }

    impl SessionDelegate for EventLog {
        fn on_state_changed(&self, state: CaptureState) {
            self.events.lock().push(format!("state:{}", state));
        }

        fn on_block_rejected(&self, error: &CaptureError) {
            self.events.lock().push(format!("rejected:{}", error));
        }

        fn on_file_ready(&self, file: &RecordedFile) {
            self.events.lock().push(format!("file:{}", file.metadata.frames));
        }

        fn on_stream_chunk(&self, chunk: &StreamChunk) {
            self.events.lock().push(format!("chunk:{}:{}", chunk.sequence, chunk.frames));
        }
    }

    #[test]
    fn scenario_a_decimates_full_scale_mono() {
        let mut session = recording(SessionConfig::new(48000, 16000, 1));
        session.record(SampleBlock::mono(vec![1.0; 3000])).unwrap();

        let file = session.stop().unwrap();
        let info = parse_wav_header(&file.bytes).unwrap();

        assert_eq!(info.data_size, 2000);
        assert_eq!(info.sample_rate, 16000);
        assert_eq!(info.channels, 1);
        let samples = decode(&file.bytes);
        assert_eq!(samples.len(), 1000);
        assert!(samples.iter().all(|&s| s == 32767));
        assert_eq!(session.state(), CaptureState::Idle);
    }

    #[test]
    fn scenario_b_interleaves_stereo_passthrough() {
        let mut session = recording(SessionConfig::new(16000, 16000, 2));
        session.record(SampleBlock::from_interleaved(&[0.0; 8], 2)).unwrap();

        let file = session.stop().unwrap();
        let info = parse_wav_header(&file.bytes).unwrap();

        assert_eq!(info.data_size, 16);
        assert_eq!(info.block_align, 4);
        assert!(file.payload().iter().all(|&b| b == 0));
    }

    #[test]
    fn scenario_c_empty_stop_is_header_only() {
        let mut session = recording(SessionConfig::default());
        let file = session.stop().unwrap();

        assert_eq!(file.bytes.len(), WAV_HEADER_SIZE);
        assert!(file.is_empty());
        let info = parse_wav_header(&file.bytes).unwrap();
        assert_eq!(info.data_size, 0);
        assert_eq!(info.chunk_size, 36);
        assert_eq!(file.mime_type(), "audio/wav");
    }

    #[test]
    fn scenario_d_paused_blocks_are_absent() {
        let mut session = recording(SessionConfig::new(16000, 16000, 1));
        session.record(SampleBlock::mono(vec![0.25; 4])).unwrap();
        session.pause().unwrap();
        assert_eq!(
            session.record(SampleBlock::mono(vec![-0.75; 4])).unwrap(),
            RecordOutcome::Ignored
        );
        session.resume().unwrap();
        session.record(SampleBlock::mono(vec![0.5; 4])).unwrap();

        let file = session.stop().unwrap();
        let samples = decode(&file.bytes);

        assert_eq!(samples.len(), 8);
        assert!(samples[..4].iter().all(|&s| s == 8191));
        assert!(samples[4..].iter().all(|&s| s == 16383));
        assert_eq!(session.diagnostics().blocks_ignored, 1);
    }

    #[test]
    fn stop_while_paused_exports() {
        let mut session = recording(SessionConfig::new(16000, 16000, 1));
        session.record(SampleBlock::mono(vec![0.0; 10])).unwrap();
        session.pause().unwrap();

        let file = session.stop().unwrap();
        assert_eq!(file.metadata.frames, 10);
        assert!(session.state().is_idle());
    }

    #[test]
    fn malformed_block_leaves_buffer_intact() {
        let mut session = recording(SessionConfig::new(16000, 16000, 2));
        session
            .record(SampleBlock::new(vec![vec![0.5, 0.5], vec![-0.5, -0.5]]))
            .unwrap();

        let err = session.record(SampleBlock::mono(vec![0.9; 2])).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::MalformedBlock(BlockRejection::ChannelMismatch { expected: 2, actual: 1 })
        ));
        let err = session
            .record(SampleBlock::new(vec![vec![0.9, f32::NAN], vec![0.9, 0.9]]))
            .unwrap_err();
        assert!(matches!(err, CaptureError::MalformedBlock(BlockRejection::NonFiniteSample { .. })));

        session
            .record(SampleBlock::new(vec![vec![0.25], vec![-0.25]]))
            .unwrap();

        let samples = decode(&session.stop().unwrap().bytes);
        assert_eq!(samples, vec![16383, -16384, 16383, -16384, 8191, -8192]);
    }

    #[test]
    fn record_requires_configure_and_start() {
        let mut session = CaptureSession::new();
        assert!(matches!(
            session.record(SampleBlock::mono(vec![0.0])),
            Err(CaptureError::ConfigurationFailed(_))
        ));
        assert!(matches!(session.start(), Err(CaptureError::ConfigurationFailed(_))));

        session.configure(SessionConfig::default()).unwrap();
        assert!(matches!(
            session.record(SampleBlock::mono(vec![0.0])),
            Err(CaptureError::ConfigurationFailed(_))
        ));
        assert_eq!(session.buffered_frames(), 0);
    }

    #[test]
    fn invalid_transitions_do_not_change_state() {
        let mut session = CaptureSession::with_config(SessionConfig::default()).unwrap();

        assert_eq!(
            session.resume(),
            Err(CaptureError::InvalidTransition {
                action: "resume",
                from: CaptureState::Idle
            })
        );
        assert!(session.pause().is_err());
        assert!(session.stop().is_err());
        assert!(session.state().is_idle());

        session.start().unwrap();
        assert!(session.start().is_err());
        assert!(session.resume().is_err());
        assert!(session.configure(SessionConfig::default()).is_err());
        assert!(session.state().is_recording());

        session.pause().unwrap();
        assert!(session.pause().is_err());
        assert!(session.state().is_paused());
    }

    #[test]
    fn clear_is_idempotent() {
        let mut session = recording(SessionConfig::new(48000, 16000, 2).with_streaming(ChunkFormat::Wav));
        session
            .record(SampleBlock::new(vec![vec![0.1; 30], vec![0.2; 30]]))
            .unwrap();
        session.export_streaming_chunk().unwrap();
        session
            .record(SampleBlock::new(vec![vec![0.1; 6], vec![0.2; 6]]))
            .unwrap();

        session.clear();
        session.clear();

        assert!(session.state().is_idle());
        assert_eq!(session.buffered_frames(), 0);
        assert_eq!(session.pending_stream_frames(), 0);
        assert!(session.config().is_some());

        // A fresh take starts from an empty buffer and chunk sequence 0.
        session.start().unwrap();
        let chunk = session.export_streaming_chunk().unwrap();
        assert_eq!(chunk.sequence, 0);
        assert!(chunk.is_empty());
    }

    #[test]
    fn streaming_chunks_cover_only_new_samples() {
        let mut session = recording(SessionConfig::new(48000, 16000, 1).with_streaming(ChunkFormat::Wav));

        session.record(SampleBlock::mono(vec![1.0; 300])).unwrap();
        let first = session.export_streaming_chunk().unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(first.start_frame, 0);
        assert_eq!(first.frames, 100);
        assert_eq!(parse_wav_header(&first.bytes).unwrap().data_size, 200);

        session.record(SampleBlock::mono(vec![-1.0; 150])).unwrap();
        let second = session.export_streaming_chunk().unwrap();
        assert_eq!(second.sequence, 1);
        assert_eq!(second.start_frame, 100);
        assert_eq!(second.frames, 50);
        assert!(decode(&second.bytes).iter().all(|&s| s == i16::MIN));

        let empty = session.export_streaming_chunk().unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.bytes.len(), WAV_HEADER_SIZE);

        // The full history is still exported on stop.
        let file = session.stop().unwrap();
        assert_eq!(file.metadata.frames, 150);
    }

    /// Record `samples` in blocks of `block_len`, exporting a chunk after each.
    fn stream_in_blocks(session: &mut CaptureSession, samples: &[f32], block_len: usize) -> Vec<i16> {
        let mut streamed = Vec::new();
        for block in samples.chunks(block_len) {
            session.record(SampleBlock::mono(block.to_vec())).unwrap();
            let chunk = session.export_streaming_chunk().unwrap();
            assert_eq!(chunk.start_frame as usize, streamed.len());
            streamed.extend(decode_pcm16(&chunk.bytes));
        }
        streamed
    }

    #[test]
    fn streaming_single_sample_blocks_lose_nothing() {
        let mut session = recording(SessionConfig::new(48000, 16000, 1).with_streaming(ChunkFormat::RawPcm));
        let samples = vec![0.5f32; 300];

        let streamed = stream_in_blocks(&mut session, &samples, 1);
        let batch = decode(&session.stop().unwrap().bytes);

        assert_eq!(streamed.len(), 100);
        assert_eq!(streamed, batch);
    }

    #[test]
    fn streaming_fractional_ratio_matches_stop_export() {
        let mut session = recording(SessionConfig::new(44100, 16000, 1).with_streaming(ChunkFormat::RawPcm));
        let samples: Vec<f32> = (0..400).map(|i| (i as f32 * 0.05).sin() * 0.8).collect();

        let streamed = stream_in_blocks(&mut session, &samples, 4);
        let batch = decode(&session.stop().unwrap().bytes);

        assert_eq!(batch.len(), 145);
        assert_eq!(streamed, batch);
    }

    #[test]
    fn streaming_holds_back_partial_window() {
        let mut session = recording(SessionConfig::new(48000, 16000, 1).with_streaming(ChunkFormat::RawPcm));
        session.record(SampleBlock::mono(vec![1.0; 4])).unwrap();

        let chunk = session.export_streaming_chunk().unwrap();
        assert_eq!(chunk.frames, 1);
        assert_eq!(session.pending_stream_frames(), 1);

        session.record(SampleBlock::mono(vec![1.0; 2])).unwrap();
        let chunk = session.export_streaming_chunk().unwrap();
        assert_eq!((chunk.start_frame, chunk.frames), (1, 1));
        assert_eq!(session.pending_stream_frames(), 0);
    }

    #[test]
    fn configure_rejects_unrepresentable_rates() {
        let mut session = CaptureSession::new();
        assert!(matches!(
            session.configure(SessionConfig::new(u32::MAX, 3_000_000_000, 2)),
            Err(CaptureError::ConfigurationFailed(_))
        ));
        assert!(session.config().is_none());
    }

    #[test]
    fn streaming_raw_pcm_has_no_header() {
        let mut session = recording(SessionConfig::new(16000, 16000, 2).with_streaming(ChunkFormat::RawPcm));
        session
            .record(SampleBlock::new(vec![vec![1.0, 0.0], vec![-1.0, 0.0]]))
            .unwrap();

        let chunk = session.export_streaming_chunk().unwrap();
        assert_eq!(chunk.format, ChunkFormat::RawPcm);
        assert_eq!(chunk.frames, 2);
        assert_eq!(decode_pcm16(&chunk.bytes), vec![i16::MAX, i16::MIN, 0, 0]);
    }

    #[test]
    fn streaming_requires_streaming_mode_and_active_take() {
        let mut session = recording(SessionConfig::default());
        assert_eq!(session.export_streaming_chunk(), Err(CaptureError::StreamingDisabled));

        let mut session =
            CaptureSession::with_config(SessionConfig::default().with_streaming(ChunkFormat::Wav)).unwrap();
        assert!(matches!(
            session.export_streaming_chunk(),
            Err(CaptureError::InvalidTransition { .. })
        ));

        let mut session = CaptureSession::new();
        assert!(matches!(
            session.export_streaming_chunk(),
            Err(CaptureError::ConfigurationFailed(_))
        ));
    }

    #[test]
    fn reject_policy_refuses_block_over_limit() {
        // 250 ms at 64 Hz = 16 samples per channel.
        let config = SessionConfig::new(64, 64, 1).with_buffer_limit(0.25, OverflowPolicy::Reject);
        let mut session = recording(config);

        session.record(SampleBlock::mono(vec![0.5; 10])).unwrap();
        let err = session.record(SampleBlock::mono(vec![0.5; 10])).unwrap_err();
        assert_eq!(err, CaptureError::MalformedBlock(BlockRejection::BufferFull { limit: 16 }));
        session.record(SampleBlock::mono(vec![0.5; 6])).unwrap();

        assert_eq!(session.buffered_frames(), 16);
        assert_eq!(session.diagnostics().blocks_rejected, 1);
    }

    #[test]
    fn drop_oldest_policy_shifts_stream_cursor() {
        let config = SessionConfig::new(64, 64, 1)
            .with_buffer_limit(0.25, OverflowPolicy::DropOldest)
            .with_streaming(ChunkFormat::RawPcm);
        let mut session = recording(config);

        session.record(SampleBlock::mono(vec![0.0; 12])).unwrap();
        session.export_streaming_chunk().unwrap();
        session.record(SampleBlock::mono(vec![0.5; 8])).unwrap();

        // 4 streamed samples were dropped; the 8 new ones are still pending.
        assert_eq!(session.buffered_frames(), 16);
        assert_eq!(session.pending_stream_frames(), 8);
        assert_eq!(session.diagnostics().frames_dropped, 4);

        let chunk = session.export_streaming_chunk().unwrap();
        assert_eq!(chunk.frames, 8);
        assert!(decode_pcm16(&chunk.bytes).iter().all(|&s| s == 16383));
    }

    #[test]
    fn levels_track_last_block() {
        let mut session = recording(SessionConfig::new(16000, 16000, 2));
        session
            .record(SampleBlock::new(vec![vec![0.5, -0.5], vec![0.0, 0.25]]))
            .unwrap();

        let levels = session.levels();
        assert_eq!(levels.len(), 2);
        assert!((levels[0].rms - 0.5).abs() < 1e-6);
        assert!((levels[0].peak - 0.5).abs() < 1e-6);
        assert!((levels[1].peak - 0.25).abs() < 1e-6);
    }

    #[test]
    fn delegate_sees_transitions_rejections_and_exports() {
        let log = Arc::new(EventLog::default());
        let mut session =
            CaptureSession::with_config(SessionConfig::new(16000, 16000, 1).with_streaming(ChunkFormat::Wav))
                .unwrap();
        session.set_delegate(log.clone());

        session.start().unwrap();
        session.record(SampleBlock::mono(vec![0.1; 3])).unwrap();
        let _ = session.record(SampleBlock::new(vec![vec![0.1], vec![0.1]]));
        session.export_streaming_chunk().unwrap();
        session.stop().unwrap();
        session.clear();

        assert_eq!(
            log.events(),
            vec![
                "state:recording".to_string(),
                "rejected:malformed block dropped: expected 1 channels, got 2".to_string(),
                "chunk:0:3".to_string(),
                "state:idle".to_string(),
                "file:3".to_string(),
            ]
        );
    }

    #[test]
    fn reconfigure_changes_channel_layout() {
        let mut session = recording(SessionConfig::new(16000, 16000, 1));
        session.record(SampleBlock::mono(vec![0.0; 4])).unwrap();
        session.stop().unwrap();

        session.configure(SessionConfig::new(44100, 22050, 2)).unwrap();
        session.start().unwrap();
        session
            .record(SampleBlock::new(vec![vec![0.5; 10], vec![0.5; 10]]))
            .unwrap();
        let file = session.stop().unwrap();

        let info = parse_wav_header(&file.bytes).unwrap();
        assert_eq!(info.channels, 2);
        assert_eq!(info.sample_rate, 22050);
        assert_eq!(info.frames(), 5);
    }

    #[test]
    fn diagnostics_count_work() {
        let mut session = recording(SessionConfig::new(48000, 16000, 1));
        session.record(SampleBlock::mono(vec![0.0; 30])).unwrap();
        session.record(SampleBlock::mono(vec![0.0; 30])).unwrap();
        session.stop().unwrap();

        let diagnostics = session.diagnostics();
        assert_eq!(diagnostics.blocks_accepted, 2);
        assert_eq!(diagnostics.frames_accumulated, 60);
        assert_eq!(diagnostics.files_exported, 1);
        assert_eq!(diagnostics.bytes_encoded, (WAV_HEADER_SIZE + 40) as u64);
    }
}
