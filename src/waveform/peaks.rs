//! Volume peak extraction for waveform display
//!
//! Streams decoded audio through fixed-size chunks and reduces it into a
//! fixed number of bins. Each bin holds the loudest sample-frame it saw,
//! where a frame's loudness is the mean absolute value of its channels. Bin
//! boundaries come from a running frame counter: `total_frames / num_peaks`
//! frames per bin, so when the total is only an estimate the last bins may
//! see more or fewer frames than the rest.
//!
//! ```no_run
//! use notewave_lib::waveform::extract_peaks;
//! use std::path::Path;
//!
//! let peaks = extract_peaks(Path::new("note.mp3"), 100)?;
//! assert_eq!(peaks.len(), 100);
//! # Ok::<(), notewave_lib::Error>(())
//! ```

use crate::codec::engine::{DecodeEngine, ReadStatus};
use crate::error::{Error, Result};
use crate::format::SymphoniaSource;
use crate::util::SampleFormat;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Number of peaks the recorder draws per voice note
pub const DEFAULT_PEAK_COUNT: usize = 100;

/// Bytes requested from the engine per read
pub const DEFAULT_CHUNK_BYTES: usize = 8192;

/// Offset added to every peak so quiet passages stay visible
pub const PEAK_FLOOR: f32 = 0.2;

const F32_SIZE: usize = std::mem::size_of::<f32>();

/// Peak extractor configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PeakConfig {
    /// Number of bins in the output
    pub num_peaks: usize,
    /// Size of each read from the decode engine
    pub chunk_bytes: usize,
    /// Offset added to every raw peak before clamping to 1.0
    pub floor: f32,
}

impl Default for PeakConfig {
    fn default() -> Self {
        PeakConfig {
            num_peaks: DEFAULT_PEAK_COUNT,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            floor: PEAK_FLOOR,
        }
    }
}

impl PeakConfig {
    /// Default configuration with a different bin count
    pub fn with_peaks(num_peaks: usize) -> Self {
        PeakConfig {
            num_peaks,
            ..Default::default()
        }
    }
}

/// Reduces a decode stream into normalised peaks
#[derive(Debug, Clone, Default)]
pub struct PeakExtractor {
    config: PeakConfig,
}

impl PeakExtractor {
    pub fn new(config: PeakConfig) -> Self {
        PeakExtractor { config }
    }

    pub fn config(&self) -> &PeakConfig {
        &self.config
    }

    /// Open `path` with engine `E` and extract its peaks
    pub fn extract_file<E: DecodeEngine>(&self, path: &Path) -> Result<Vec<f32>> {
        self.validate()?;
        let engine = E::open(path)?;
        self.extract(engine)
    }

    /// Open `path` with the Symphonia engine and extract its peaks
    pub fn extract_path(&self, path: &Path) -> Result<Vec<f32>> {
        self.extract_file::<SymphoniaSource>(path)
    }

    /// Consume `engine` and reduce its stream into exactly `num_peaks` values
    /// in `[0.0, 1.0]`.
    ///
    /// The engine is closed before returning, on success and on every error.
    /// A decode error mid-stream ends extraction early but is not an error:
    /// the bins filled so far are kept and the rest stay at the floor.
    pub fn extract<E: DecodeEngine>(&self, mut engine: E) -> Result<Vec<f32>> {
        let result = self.run(&mut engine);
        engine.close();
        result
    }

    fn validate(&self) -> Result<()> {
        if self.config.num_peaks == 0 {
            return Err(Error::invalid_input("Peak count must be positive"));
        }
        if self.config.chunk_bytes < F32_SIZE {
            return Err(Error::Config(format!(
                "Chunk of {} bytes cannot hold a sample",
                self.config.chunk_bytes
            )));
        }
        Ok(())
    }

    fn run<E: DecodeEngine>(&self, engine: &mut E) -> Result<Vec<f32>> {
        self.validate()?;
        let num_peaks = self.config.num_peaks;

        let format = engine.format()?;
        if format.channels == 0 {
            return Err(Error::format("Stream has no channels"));
        }
        if format.encoding != SampleFormat::F32 || engine.output_encoding() != SampleFormat::F32 {
            debug!("Renegotiating output: {} -> f32", format.encoding);
            engine.set_output_encoding(SampleFormat::F32)?;
        }

        let total_frames = match engine.length() {
            Some(0) => return Err(Error::invalid_input("Source has no samples")),
            Some(frames) => frames,
            None => return Err(Error::UnknownLength),
        };
        let samples_per_bin = total_frames / num_peaks as u64;

        let channels = format.channels as usize;
        // Whole frames only, so no frame straddles two reads.
        let buffer_len = (self.config.chunk_bytes / F32_SIZE) / channels * channels;
        if buffer_len == 0 {
            return Err(Error::Config(format!(
                "Chunk of {} bytes cannot hold a {}-channel frame",
                self.config.chunk_bytes, channels
            )));
        }
        let mut buffer = vec![0f32; buffer_len];

        let mut peaks = vec![0f32; num_peaks];
        let mut current_bin = 0usize;
        let mut current_max = 0f32;
        let mut sample_index = 0u64;

        'decode: loop {
            let outcome = engine.read(bytemuck::cast_slice_mut(&mut buffer));
            if outcome.status == ReadStatus::Error {
                warn!(
                    "Decode error after {} of {} bins; keeping partial peaks",
                    current_bin, num_peaks
                );
                break;
            }

            let samples = (outcome.bytes / F32_SIZE).min(buffer_len);
            for frame in buffer[..samples].chunks_exact(channels) {
                let amplitude = frame.iter().map(|s| s.abs()).sum::<f32>() / channels as f32;
                current_max = current_max.max(amplitude);
                sample_index += 1;

                if sample_index >= samples_per_bin {
                    if current_bin < num_peaks {
                        peaks[current_bin] = current_max;
                    }
                    current_bin += 1;
                    sample_index = 0;
                    current_max = 0.0;

                    if current_bin >= num_peaks {
                        break 'decode;
                    }
                }
            }

            if outcome.status == ReadStatus::Done {
                break;
            }
        }

        debug!(
            "Filled {} of {} bins ({} frames per bin)",
            current_bin.min(num_peaks),
            num_peaks,
            samples_per_bin
        );

        let floor = self.config.floor;
        for peak in &mut peaks {
            *peak = (*peak + floor).min(1.0);
        }
        Ok(peaks)
    }
}

/// Extract `num_peaks` normalised peaks from the audio file at `path`
pub fn extract_peaks(path: &Path, num_peaks: usize) -> Result<Vec<f32>> {
    PeakExtractor::new(PeakConfig::with_peaks(num_peaks)).extract_path(path)
}

/// Extract peaks for several files on the rayon pool.
///
/// Every file gets its own decode session; results are returned in input
/// order.
pub fn extract_peaks_batch(paths: &[PathBuf], num_peaks: usize) -> Vec<Result<Vec<f32>>> {
    let extractor = PeakExtractor::new(PeakConfig::with_peaks(num_peaks));
    paths
        .par_iter()
        .map(|path| extractor.extract_path(path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::engine::{ReadOutcome, StreamFormat};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct EngineLog {
        closed: bool,
        reads: usize,
        forced: Vec<SampleFormat>,
    }

    /// Engine that replays scripted reads
    struct ScriptedEngine {
        format: StreamFormat,
        output: SampleFormat,
        length: Option<u64>,
        reads: VecDeque<(Vec<f32>, ReadStatus)>,
        log: Rc<RefCell<EngineLog>>,
    }

    impl ScriptedEngine {
        fn new(channels: u16, length: Option<u64>) -> (Self, Rc<RefCell<EngineLog>>) {
            let log = Rc::new(RefCell::new(EngineLog::default()));
            let engine = ScriptedEngine {
                format: StreamFormat {
                    sample_rate: 8000,
                    channels,
                    encoding: SampleFormat::F32,
                },
                output: SampleFormat::F32,
                length,
                reads: VecDeque::new(),
                log: Rc::clone(&log),
            };
            (engine, log)
        }

        fn push(mut self, samples: Vec<f32>, status: ReadStatus) -> Self {
            self.reads.push_back((samples, status));
            self
        }
    }

    impl DecodeEngine for ScriptedEngine {
        fn open(_path: &Path) -> Result<Self> {
            Err(Error::unsupported("scripted engine has no files"))
        }

        fn format(&mut self) -> Result<StreamFormat> {
            Ok(self.format)
        }

        fn set_output_encoding(&mut self, encoding: SampleFormat) -> Result<()> {
            self.log.borrow_mut().forced.push(encoding);
            self.output = encoding;
            Ok(())
        }

        fn output_encoding(&self) -> SampleFormat {
            self.output
        }

        fn length(&mut self) -> Option<u64> {
            self.length
        }

        fn read(&mut self, buf: &mut [u8]) -> ReadOutcome {
            self.log.borrow_mut().reads += 1;
            match self.reads.pop_front() {
                Some((samples, status)) => {
                    let bytes: &[u8] = bytemuck::cast_slice(&samples);
                    buf[..bytes.len()].copy_from_slice(bytes);
                    ReadOutcome {
                        bytes: bytes.len(),
                        status,
                    }
                }
                None => ReadOutcome::done(0),
            }
        }

        fn close(&mut self) {
            self.log.borrow_mut().closed = true;
        }
    }

    fn extractor(num_peaks: usize) -> PeakExtractor {
        PeakExtractor::new(PeakConfig::with_peaks(num_peaks))
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "got {:?}, expected {:?}", actual, expected);
        }
    }

    #[test]
    fn test_ramp_is_monotonic() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32 / 999.0).collect();
        let (engine, log) = ScriptedEngine::new(1, Some(1000));
        let engine = engine.push(samples, ReadStatus::Done);

        let peaks = extractor(10).extract(engine).unwrap();
        assert_eq!(peaks.len(), 10);
        for pair in peaks.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        for (bin, peak) in peaks.iter().enumerate() {
            let bin_max = (bin * 100 + 99) as f32 / 999.0;
            assert!((peak - (bin_max + 0.2).min(1.0)).abs() < 1e-5);
        }
        assert!(log.borrow().closed);
    }

    #[test]
    fn test_silence_sits_at_floor() {
        let (engine, _) = ScriptedEngine::new(2, Some(500));
        let engine = engine.push(vec![0.0; 1000], ReadStatus::Done);
        let peaks = extractor(7).extract(engine).unwrap();
        assert_close(&peaks, &[0.2; 7]);
    }

    #[test]
    fn test_channels_are_averaged() {
        let (engine, _) = ScriptedEngine::new(2, Some(2));
        let engine = engine.push(vec![0.5, -1.0, 0.1, 0.1], ReadStatus::Done);
        let peaks = extractor(2).extract(engine).unwrap();
        assert_close(&peaks, &[0.95, 0.3]);
    }

    #[test]
    fn test_loud_peaks_clamp_to_one() {
        let (engine, _) = ScriptedEngine::new(1, Some(4));
        let engine = engine.push(vec![1.0, -0.9, 0.5, 0.0], ReadStatus::Done);
        let peaks = extractor(2).extract(engine).unwrap();
        assert_close(&peaks, &[1.0, 0.7]);
    }

    #[test]
    fn test_more_peaks_than_frames() {
        let (engine, _) = ScriptedEngine::new(1, Some(3));
        let engine = engine.push(vec![0.5, 0.5, 0.5], ReadStatus::Done);
        let peaks = extractor(5).extract(engine).unwrap();
        assert_close(&peaks, &[0.7, 0.7, 0.7, 0.2, 0.2]);
    }

    #[test]
    fn test_zero_peaks_rejected() {
        let (engine, log) = ScriptedEngine::new(1, Some(100));
        let result = extractor(0).extract(engine);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(log.borrow().closed);
    }

    #[test]
    fn test_unknown_length_rejected() {
        let (engine, log) = ScriptedEngine::new(1, None);
        let result = extractor(10).extract(engine);
        assert!(matches!(result, Err(Error::UnknownLength)));
        assert!(log.borrow().closed);
        assert_eq!(log.borrow().reads, 0);
    }

    #[test]
    fn test_empty_length_rejected() {
        let (engine, _) = ScriptedEngine::new(1, Some(0));
        assert!(matches!(
            extractor(10).extract(engine),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_float_source_renegotiated() {
        let (mut engine, log) = ScriptedEngine::new(1, Some(2));
        engine.format.encoding = SampleFormat::I16;
        engine.output = SampleFormat::I16;
        let engine = engine.push(vec![0.25, 0.25], ReadStatus::Done);

        extractor(2).extract(engine).unwrap();
        assert_eq!(log.borrow().forced, vec![SampleFormat::F32]);
    }

    #[test]
    fn test_float_source_not_renegotiated() {
        let (engine, log) = ScriptedEngine::new(1, Some(2));
        let engine = engine.push(vec![0.25, 0.25], ReadStatus::Done);
        extractor(2).extract(engine).unwrap();
        assert!(log.borrow().forced.is_empty());
    }

    // Mid-stream decode errors end the stream but keep what was decoded.
    #[test]
    fn test_decode_error_keeps_partial_bins() {
        let (engine, log) = ScriptedEngine::new(1, Some(8));
        let engine = engine
            .push(vec![0.4, 0.1, 0.3, 0.3], ReadStatus::Ok)
            .push(vec![0.9; 4], ReadStatus::Error);

        let peaks = extractor(4).extract(engine).unwrap();
        assert_close(&peaks, &[0.6, 0.5, 0.2, 0.2]);
        assert!(log.borrow().closed);
    }

    #[test]
    fn test_empty_reads_are_not_errors() {
        let (engine, _) = ScriptedEngine::new(1, Some(4));
        let engine = engine
            .push(vec![], ReadStatus::Ok)
            .push(vec![0.3, 0.3], ReadStatus::Ok)
            .push(vec![], ReadStatus::Ok)
            .push(vec![0.6, 0.6], ReadStatus::Done);
        let peaks = extractor(2).extract(engine).unwrap();
        assert_close(&peaks, &[0.5, 0.8]);
    }

    #[test]
    fn test_stops_once_bins_are_full() {
        // Length underestimates the stream; extra data must not be read.
        let (engine, log) = ScriptedEngine::new(1, Some(4));
        let engine = engine
            .push(vec![0.1; 4], ReadStatus::Ok)
            .push(vec![0.9; 4], ReadStatus::Ok)
            .push(vec![0.9; 4], ReadStatus::Done);
        let peaks = extractor(2).extract(engine).unwrap();
        assert_close(&peaks, &[0.3, 0.3]);
        assert_eq!(log.borrow().reads, 1);
    }

    #[test]
    fn test_final_partial_bin_not_committed() {
        // 5 frames into 2 bins of 2: the fifth frame never completes a bin.
        let (engine, _) = ScriptedEngine::new(1, Some(5));
        let engine = engine.push(vec![0.1, 0.2, 0.3, 0.4, 0.8], ReadStatus::Done);
        let peaks = extractor(2).extract(engine).unwrap();
        assert_close(&peaks, &[0.4, 0.6]);
    }

    #[test]
    fn test_idempotent() {
        let samples: Vec<f32> = (0..300).map(|i| ((i * 37) % 100) as f32 / 100.0).collect();
        let run = || {
            let (engine, _) = ScriptedEngine::new(1, Some(300));
            extractor(12)
                .extract(engine.push(samples.clone(), ReadStatus::Done))
                .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_chunk_too_small() {
        let (engine, _) = ScriptedEngine::new(2, Some(10));
        let extractor = PeakExtractor::new(PeakConfig {
            chunk_bytes: 4,
            ..PeakConfig::with_peaks(2)
        });
        assert!(matches!(extractor.extract(engine), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_channels_rejected() {
        let (engine, log) = ScriptedEngine::new(0, Some(10));
        let engine = engine.push(vec![0.5; 10], ReadStatus::Done);

        assert!(matches!(extractor(4).extract(engine), Err(Error::Format(_))));
        assert!(log.borrow().closed);
        assert_eq!(log.borrow().reads, 0);
    }

    #[test]
    fn test_default_config() {
        let config = PeakConfig::default();
        assert_eq!(config.num_peaks, 100);
        assert_eq!(config.chunk_bytes, 8192);
        assert!((config.floor - 0.2).abs() < f32::EPSILON);
    }
}
