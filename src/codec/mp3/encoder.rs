//! MP3 encoder using libmp3lame
//!
//! Encodes 16-bit PCM to constant-bitrate MP3. The LAME instance is created
//! on the first `encode` call and dropped by `close`; encoding again after a
//! close starts a fresh stream.

use crate::codec::encoder::{EncodeQuality, Encoder, Mp3EncoderConfig};
use crate::error::{Error, Result};
use mp3lame_encoder::{
    max_required_buffer_size, Bitrate, Builder, Encoder as LameEncoder, FlushNoGap,
    InterleavedPcm, MonoPcm, Quality,
};
use tracing::debug;

/// Worst-case size of the tail LAME emits on flush
const FLUSH_BUFFER_SIZE: usize = 7200;

/// Constant-bitrate MP3 encoder
pub struct Mp3Encoder {
    config: Mp3EncoderConfig,
    lame: Option<LameEncoder>,
}

impl Mp3Encoder {
    /// Create an encoder for mono input at `sample_rate`
    pub fn new(sample_rate: u32) -> Result<Self> {
        Self::with_config(Mp3EncoderConfig {
            sample_rate,
            ..Default::default()
        })
    }

    /// Create an encoder with a custom configuration
    pub fn with_config(config: Mp3EncoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Mp3Encoder { config, lame: None })
    }

    pub fn config(&self) -> &Mp3EncoderConfig {
        &self.config
    }

    /// Whether a LAME instance is currently live
    pub fn is_initialized(&self) -> bool {
        self.lame.is_some()
    }

    fn build(config: &Mp3EncoderConfig) -> Result<LameEncoder> {
        let mut builder =
            Builder::new().ok_or_else(|| Error::Init("Failed to allocate LAME encoder".into()))?;

        builder
            .set_num_channels(config.channels as u8)
            .map_err(|e| Error::codec(format!("Failed to set channels: {:?}", e)))?;
        builder
            .set_sample_rate(config.sample_rate)
            .map_err(|e| Error::codec(format!("Failed to set sample rate: {:?}", e)))?;
        builder
            .set_brate(lame_bitrate(config.bitrate_kbps)?)
            .map_err(|e| Error::codec(format!("Failed to set bitrate: {:?}", e)))?;
        builder
            .set_quality(lame_quality(config.quality))
            .map_err(|e| Error::codec(format!("Failed to set quality: {:?}", e)))?;

        debug!(
            "LAME init: {} Hz, {} ch, {} kbps",
            config.sample_rate, config.channels, config.bitrate_kbps
        );

        builder
            .build()
            .map_err(|e| Error::Init(format!("Failed to initialize LAME: {:?}", e)))
    }
}

fn lame_bitrate(kbps: u32) -> Result<Bitrate> {
    let bitrate = match kbps {
        8 => Bitrate::Kbps8,
        16 => Bitrate::Kbps16,
        24 => Bitrate::Kbps24,
        32 => Bitrate::Kbps32,
        40 => Bitrate::Kbps40,
        48 => Bitrate::Kbps48,
        64 => Bitrate::Kbps64,
        80 => Bitrate::Kbps80,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        other => {
            return Err(Error::Config(format!("Invalid MP3 bitrate: {} kbps", other)));
        }
    };
    Ok(bitrate)
}

fn lame_quality(quality: EncodeQuality) -> Quality {
    match quality {
        EncodeQuality::Best => Quality::Best,
        EncodeQuality::Good => Quality::Good,
        EncodeQuality::Fast => Quality::Worst,
    }
}

impl Encoder for Mp3Encoder {
    fn encode(&mut self, pcm: &[i16], out: &mut Vec<u8>) -> Result<usize> {
        if self.lame.is_none() {
            self.lame = Some(Self::build(&self.config)?);
        }
        let lame = self
            .lame
            .as_mut()
            .ok_or_else(|| Error::invalid_state("Encoder not initialized"))?;

        // Output goes into spare capacity, so make room for the worst case.
        out.reserve(max_required_buffer_size(pcm.len()));
        if self.config.channels == 1 {
            lame.encode_to_vec(MonoPcm(pcm), out)
        } else {
            lame.encode_to_vec(InterleavedPcm(pcm), out)
        }
        .map_err(|e| Error::codec(format!("MP3 encoding failed: {:?}", e)))
    }

    fn flush(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let lame = self
            .lame
            .as_mut()
            .ok_or_else(|| Error::invalid_state("Encoder not initialized"))?;

        out.reserve(FLUSH_BUFFER_SIZE);
        lame.flush_to_vec::<FlushNoGap>(out)
            .map_err(|e| Error::codec(format!("MP3 flush failed: {:?}", e)))
    }

    fn close(&mut self) {
        if self.lame.take().is_some() {
            debug!("LAME closed");
        }
    }
}
