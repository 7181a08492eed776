//! Volume levels and duration of a recording

use super::peaks::extract_peaks;
use crate::codec::mp3::duration;
use crate::error::Result;
use std::path::Path;
use std::time::Duration;

/// What the recorder shows for a saved voice note
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformSummary {
    /// Normalised peaks, one per bar
    pub peaks: Vec<f32>,
    /// Playback length
    pub duration: Duration,
}

/// Compute the waveform bars and duration of the file at `path`
pub fn summarize(path: &Path, num_peaks: usize) -> Result<WaveformSummary> {
    let seconds = duration(path)?;
    let peaks = extract_peaks(path, num_peaks)?;
    Ok(WaveformSummary {
        peaks,
        duration: Duration::from_secs_f64(seconds),
    })
}
