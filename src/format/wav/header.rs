//! WAV format chunk

use crate::error::{Error, Result};
use crate::util::SampleFormat;

/// WAV format tag identifying the sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    /// Integer PCM
    Pcm,
    /// IEEE float
    IeeeFloat,
}

impl From<FormatTag> for u16 {
    fn from(tag: FormatTag) -> Self {
        match tag {
            FormatTag::Pcm => 0x0001,
            FormatTag::IeeeFloat => 0x0003,
        }
    }
}

/// WAV format chunk data
#[derive(Debug, Clone)]
pub struct WavFormat {
    /// Format tag
    pub format_tag: FormatTag,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Average bytes per second
    pub byte_rate: u32,
    /// Block alignment
    pub block_align: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// Describe a 16-bit PCM or 32-bit float stream
    pub fn new(sample_rate: u32, channels: u16, sample_fmt: SampleFormat) -> Result<Self> {
        let (format_tag, bits_per_sample) = match sample_fmt {
            SampleFormat::I16 => (FormatTag::Pcm, 16),
            SampleFormat::F32 => (FormatTag::IeeeFloat, 32),
            _ => {
                return Err(Error::unsupported(format!(
                    "Sample format not supported for WAV: {}",
                    sample_fmt
                )))
            }
        };

        let block_align = channels * (bits_per_sample / 8);
        let format = WavFormat {
            format_tag,
            channels,
            sample_rate,
            byte_rate: sample_rate * block_align as u32,
            block_align,
            bits_per_sample,
        };
        format.validate()?;
        Ok(format)
    }

    /// Convert to bytes for writing
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(16);

        bytes.extend_from_slice(&u16::from(self.format_tag).to_le_bytes());
        bytes.extend_from_slice(&self.channels.to_le_bytes());
        bytes.extend_from_slice(&self.sample_rate.to_le_bytes());
        bytes.extend_from_slice(&self.byte_rate.to_le_bytes());
        bytes.extend_from_slice(&self.block_align.to_le_bytes());
        bytes.extend_from_slice(&self.bits_per_sample.to_le_bytes());

        bytes
    }

    /// Validate format parameters
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(Error::format("Invalid channel count: 0"));
        }

        if self.sample_rate == 0 {
            return Err(Error::format("Invalid sample rate: 0"));
        }

        Ok(())
    }
}
