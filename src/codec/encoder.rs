//! Encoder trait and configuration

use crate::error::{Error, Result};

/// Encoder for 16-bit PCM input
pub trait Encoder {
    /// Encode interleaved samples, appending compressed bytes to `out`.
    ///
    /// Returns the number of bytes appended.
    fn encode(&mut self, pcm: &[i16], out: &mut Vec<u8>) -> Result<usize>;

    /// Drain buffered audio into `out`
    fn flush(&mut self, out: &mut Vec<u8>) -> Result<usize>;

    /// Release the encoder
    fn close(&mut self);
}

/// Encoder speed/quality trade-off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeQuality {
    Best,
    Good,
    Fast,
}

/// MP3 encoder configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mp3EncoderConfig {
    /// Input sample rate in Hz
    pub sample_rate: u32,
    /// Input channel count (1 or 2)
    pub channels: u16,
    /// Constant bitrate in kbit/s
    pub bitrate_kbps: u32,
    pub quality: EncodeQuality,
}

impl Default for Mp3EncoderConfig {
    fn default() -> Self {
        Mp3EncoderConfig {
            sample_rate: 44100,
            channels: 1,
            bitrate_kbps: 128,
            quality: EncodeQuality::Good,
        }
    }
}

/// Bitrates accepted for MPEG-1/2 Layer III CBR encoding
pub const MP3_BITRATES: [u32; 16] = [
    8, 16, 24, 32, 40, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];

impl Mp3EncoderConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !matches!(
            self.sample_rate,
            8000 | 11025 | 12000 | 16000 | 22050 | 24000 | 32000 | 44100 | 48000
        ) {
            return Err(Error::Config(format!(
                "Invalid MP3 sample rate: {}",
                self.sample_rate
            )));
        }

        if self.channels == 0 || self.channels > 2 {
            return Err(Error::Config(format!(
                "Invalid channel count: {}. MP3 supports mono (1) or stereo (2)",
                self.channels
            )));
        }

        if !MP3_BITRATES.contains(&self.bitrate_kbps) {
            return Err(Error::Config(format!(
                "Invalid MP3 bitrate: {} kbps",
                self.bitrate_kbps
            )));
        }

        Ok(())
    }
}
