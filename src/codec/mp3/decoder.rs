//! MP3 streaming decoder using Symphonia

use crate::codec::engine::DecodeEngine;
use crate::codec::Decoder;
use crate::error::{Error, Result};
use crate::format::SymphoniaSource;
use serde::Serialize;
use std::path::Path;
use symphonia::core::conv::IntoSample;
use tracing::debug;

/// Stream parameters, determined once the first frame header is parsed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamStats {
    pub header_parsed: bool,
    pub channels: u16,
    pub sample_rate: u32,
    /// Bitrate of the first frame in kbit/s
    pub bitrate_kbps: u32,
    /// Total sample-frames, declared or estimated
    pub num_samples: Option<u64>,
    /// Whether `num_samples` was estimated from size and bitrate
    pub length_estimated: bool,
    /// Sample-frames per codec frame
    pub samples_per_frame: u64,
    pub secs_per_frame: f64,
    /// Number of codec frames, 0 when unknown
    pub total_frames: u64,
    /// Duration in seconds, 0 when unknown
    pub duration_secs: f64,
}

impl StreamStats {
    fn determine(source: &mut SymphoniaSource) -> Result<Self> {
        let format = source.format()?;
        let bitrate_kbps = source.bitrate_kbps().unwrap_or(0);
        let num_samples = source.length();
        let length_estimated = num_samples.is_some() && source.declared_length().is_none();
        let samples_per_frame = source.frames_per_packet().unwrap_or(0);

        let secs_per_frame = if samples_per_frame > 0 {
            samples_per_frame as f64 / format.sample_rate as f64
        } else {
            0.0
        };

        let (total_frames, duration_secs) = match num_samples {
            Some(n) if samples_per_frame > 0 => (
                n / samples_per_frame,
                n as f64 / samples_per_frame as f64 * secs_per_frame,
            ),
            _ => (0, 0.0),
        };

        Ok(StreamStats {
            header_parsed: true,
            channels: format.channels,
            sample_rate: format.sample_rate,
            bitrate_kbps,
            num_samples,
            length_estimated,
            samples_per_frame,
            secs_per_frame,
            total_frames,
            duration_secs,
        })
    }
}

/// Frame-by-frame MP3 decoder yielding 16-bit left/right PCM
pub struct Mp3Decoder {
    source: SymphoniaSource,
    stats: StreamStats,
    frame: Vec<f32>,
}

impl Mp3Decoder {
    /// Open an MP3 file for decoding
    pub fn open(path: &Path) -> Result<Self> {
        let source = SymphoniaSource::open(path)?;
        Ok(Mp3Decoder {
            source,
            stats: StreamStats::default(),
            frame: Vec::new(),
        })
    }

    /// Stream stats, parsing the header on first use
    pub fn stats(&mut self) -> Result<&StreamStats> {
        if !self.stats.header_parsed {
            self.stats = StreamStats::determine(&mut self.source)?;
            debug!("Stream stats: {:?}", self.stats);
        }
        Ok(&self.stats)
    }

    pub fn is_parsed(&mut self) -> bool {
        self.stats().map(|s| s.header_parsed).unwrap_or(false)
    }

    pub fn is_stereo(&mut self) -> bool {
        self.stats().map(|s| s.channels == 2).unwrap_or(false)
    }

    pub fn sample_rate(&mut self) -> u32 {
        self.stats().map(|s| s.sample_rate).unwrap_or(0)
    }

    pub fn bitrate(&mut self) -> u32 {
        self.stats().map(|s| s.bitrate_kbps).unwrap_or(0)
    }

    /// Codec frame count from the cached stats; 0 before the header is parsed
    pub fn frames_count(&self) -> u64 {
        self.stats.total_frames
    }

    /// Samples per codec frame from the cached stats
    pub fn frame_size(&self) -> u64 {
        self.stats.samples_per_frame
    }

    /// Whether the decoder has been closed
    pub fn is_closed(&self) -> bool {
        !self.source.is_open()
    }
}

impl Decoder for Mp3Decoder {
    fn decode(&mut self, left: &mut Vec<i16>, right: &mut Vec<i16>) -> Result<usize> {
        if self.is_closed() {
            return Err(Error::invalid_state("Decoder closed"));
        }

        let channels = self.stats()?.channels as usize;
        if channels == 0 {
            return Err(Error::format("Stream has no channels"));
        }

        let samples = self.source.read_frame(&mut self.frame)?;
        if samples == 0 {
            return Ok(0);
        }

        let per_channel = samples / channels;
        if left.len() < per_channel {
            left.resize(per_channel, 0);
        }
        if right.len() < per_channel {
            right.resize(per_channel, 0);
        }

        for (i, frame) in self.frame.chunks_exact(channels).enumerate() {
            let l: i16 = frame[0].into_sample();
            left[i] = l;
            // Mono is duplicated so both outputs always carry audio.
            right[i] = if channels > 1 { frame[1].into_sample() } else { l };
        }

        Ok(per_channel)
    }

    fn close(&mut self) {
        self.source.close();
        self.frame = Vec::new();
    }
}

/// Duration of the audio file at `path` in seconds
pub fn duration(path: &Path) -> Result<f64> {
    let mut source = SymphoniaSource::open(path)?;
    let format = source.format()?;
    let length = source.length().ok_or(Error::UnknownLength)?;
    Ok(length as f64 / format.sample_rate as f64)
}
