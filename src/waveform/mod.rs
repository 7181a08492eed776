//! Waveform data for voice-note display

pub mod peaks;
pub mod summary;

pub use peaks::{
    extract_peaks, extract_peaks_batch, PeakConfig, PeakExtractor, DEFAULT_CHUNK_BYTES,
    DEFAULT_PEAK_COUNT, PEAK_FLOOR,
};
pub use summary::{summarize, WaveformSummary};
