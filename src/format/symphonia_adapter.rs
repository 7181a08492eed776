//! Symphonia-backed decode engine
//!
//! [`SymphoniaSource`] opens any file Symphonia can probe (MP3 and WAV are
//! enabled), decodes it packet by packet, and serves interleaved PCM through
//! the [`DecodeEngine`] contract. Decoded audio is staged as `f32` and
//! converted to the requested output encoding as it is handed out, so the
//! output encoding can be switched at any point without losing samples.

use crate::codec::engine::{DecodeEngine, ReadOutcome, StreamFormat};
use crate::error::{Error, Result};
use crate::util::SampleFormat;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Outcome of decoding one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeStep {
    Decoded,
    End,
    Failed,
}

impl DecodeStep {
    /// Look-ahead outcome: running out of packets is fine, a failed decode is not
    fn into_result(self) -> Result<()> {
        match self {
            DecodeStep::Decoded | DecodeStep::End => Ok(()),
            DecodeStep::Failed => Err(Error::codec("Failed to decode first packet")),
        }
    }
}

/// Size and duration of the first decoded packet, used for bitrate
#[derive(Debug, Clone, Copy)]
struct PacketShape {
    bytes: usize,
    frames: u64,
}

/// Decode engine over a Symphonia format reader and decoder
pub struct SymphoniaSource {
    reader: Option<Box<dyn FormatReader>>,
    decoder: Option<Box<dyn Decoder>>,
    track_id: u32,
    byte_len: Option<u64>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    native: SampleFormat,
    n_frames: Option<u64>,
    max_frames_per_packet: Option<u64>,
    first_packet: Option<PacketShape>,
    output: SampleFormat,
    output_forced: bool,
    /// Decoded interleaved samples not yet handed to the caller
    pending: Vec<f32>,
    pending_pos: usize,
}

impl SymphoniaSource {
    /// Size of the underlying file in bytes
    pub fn byte_len(&self) -> Option<u64> {
        self.byte_len
    }

    /// Whether the session still holds a reader and decoder
    pub fn is_open(&self) -> bool {
        self.reader.is_some() && self.decoder.is_some()
    }

    /// Frame count reported by the format reader, before any estimate of ours
    pub fn declared_length(&self) -> Option<u64> {
        self.n_frames
    }

    /// Samples per channel in one codec frame (1152 for MPEG-1 Layer III)
    pub fn frames_per_packet(&mut self) -> Option<u64> {
        if self.max_frames_per_packet.is_some() {
            return self.max_frames_per_packet;
        }
        if let Err(e) = self.prime() {
            warn!("{}", e);
        }
        self.first_packet.map(|p| p.frames)
    }

    /// Bitrate of the first packet in kbit/s
    pub fn bitrate_kbps(&mut self) -> Option<u32> {
        if let Err(e) = self.prime() {
            warn!("{}", e);
        }
        let shape = self.first_packet?;
        let rate = self.sample_rate?;
        if shape.frames == 0 {
            return None;
        }
        let bits_per_sec = shape.bytes as f64 * 8.0 * rate as f64 / shape.frames as f64;
        Some((bits_per_sec / 1000.0).round() as u32)
    }

    /// Move the next decoded packet's interleaved samples into `out`.
    ///
    /// Returns the number of samples written (all channels), or 0 once the
    /// stream is exhausted. `out` is cleared first.
    pub fn read_frame(&mut self, out: &mut Vec<f32>) -> Result<usize> {
        out.clear();
        if !self.is_open() {
            return Err(Error::invalid_state("Source closed"));
        }

        if self.pending_pos >= self.pending.len() {
            self.pending.clear();
            self.pending_pos = 0;
            match self.decode_next() {
                DecodeStep::Decoded => {}
                DecodeStep::End => return Ok(0),
                DecodeStep::Failed => return Err(Error::codec("Failed to decode frame")),
            }
        }

        out.extend_from_slice(&self.pending[self.pending_pos..]);
        self.pending.clear();
        self.pending_pos = 0;
        Ok(out.len())
    }

    /// Decode one packet ahead if nothing has been decoded yet
    fn prime(&mut self) -> Result<()> {
        if !self.is_open() {
            return Err(Error::invalid_state("Source closed"));
        }
        if self.first_packet.is_some() {
            return Ok(());
        }
        self.decode_next().into_result()
    }

    /// Decode the next packet of the selected track and append it to the
    /// pending samples
    fn decode_next(&mut self) -> DecodeStep {
        let (reader, decoder) = match (self.reader.as_mut(), self.decoder.as_mut()) {
            (Some(reader), Some(decoder)) => (reader, decoder),
            _ => return DecodeStep::Failed,
        };

        loop {
            let packet = match reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return DecodeStep::End;
                }
                Err(e) => {
                    warn!("Failed to read packet: {}", e);
                    return DecodeStep::Failed;
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let frames = decoded.frames() as u64;

                    if self.native == SampleFormat::Unknown {
                        self.native = native_encoding(&decoded);
                        if !self.output_forced && self.native.is_output_format() {
                            self.output = self.native;
                        }
                    }
                    self.sample_rate.get_or_insert(spec.rate);
                    self.channels.get_or_insert(spec.channels.count() as u16);
                    if self.first_packet.is_none() && frames > 0 {
                        self.first_packet = Some(PacketShape {
                            bytes: packet.buf().len(),
                            frames,
                        });
                    }

                    let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    samples.copy_interleaved_ref(decoded);
                    self.pending.extend_from_slice(samples.samples());
                    return DecodeStep::Decoded;
                }
                Err(SymphoniaError::DecodeError(msg)) => {
                    // Corrupt frame; the decoder resyncs on the next packet.
                    warn!("Skipping undecodable packet: {}", msg);
                    continue;
                }
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return DecodeStep::End;
                }
                Err(e) => {
                    warn!("Decoder failed: {}", e);
                    return DecodeStep::Failed;
                }
            }
        }
    }

    fn write_pending(&mut self, buf: &mut [u8], count: usize) {
        let src = &self.pending[self.pending_pos..self.pending_pos + count];
        match self.output {
            SampleFormat::F32 => {
                buf[..count * 4].copy_from_slice(bytemuck::cast_slice(src));
            }
            _ => {
                for (dst, &sample) in buf.chunks_exact_mut(2).zip(src) {
                    let value: i16 = sample.into_sample();
                    dst.copy_from_slice(&value.to_ne_bytes());
                }
            }
        }
        self.pending_pos += count;
    }
}

/// Sample-frames in `byte_len` bytes of constant-bitrate audio, the way
/// mpg123 estimates the length of a stream without an Info/Xing tag
pub fn estimate_length(byte_len: u64, kbps: u32, sample_rate: u32) -> Option<u64> {
    if kbps == 0 || sample_rate == 0 {
        return None;
    }
    let seconds = byte_len as f64 * 8.0 / (kbps as f64 * 1000.0);
    Some((seconds * sample_rate as f64) as u64)
}

fn native_encoding(decoded: &AudioBufferRef<'_>) -> SampleFormat {
    match decoded {
        AudioBufferRef::U8(_) => SampleFormat::U8,
        AudioBufferRef::S16(_) => SampleFormat::I16,
        AudioBufferRef::S32(_) => SampleFormat::I32,
        AudioBufferRef::F32(_) => SampleFormat::F32,
        AudioBufferRef::F64(_) => SampleFormat::F64,
        _ => SampleFormat::Unknown,
    }
}

impl DecodeEngine for SymphoniaSource {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let byte_len = file.metadata().ok().map(|m| m.len());

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::format(format!("Failed to probe file: {}", e)))?;

        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::format("No supported audio track found"))?;

        let params = track.codec_params.clone();
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| Error::codec(format!("Unsupported codec: {}", e)))?;

        let native = params
            .sample_format
            .map(SampleFormat::from)
            .unwrap_or(SampleFormat::Unknown);
        // Until told otherwise, emit the native encoding when it is one we can
        // produce and 16-bit PCM otherwise.
        let output = if native.is_output_format() {
            native
        } else {
            SampleFormat::I16
        };

        debug!(
            "Opened {}: rate={:?} channels={:?} frames={:?} native={}",
            path.display(),
            params.sample_rate,
            params.channels.map(|c| c.count()),
            params.n_frames,
            native
        );

        Ok(SymphoniaSource {
            reader: Some(reader),
            decoder: Some(decoder),
            track_id,
            byte_len,
            sample_rate: params.sample_rate,
            channels: params.channels.map(|c| c.count() as u16),
            native,
            n_frames: params.n_frames,
            max_frames_per_packet: params.max_frames_per_packet,
            first_packet: None,
            output,
            output_forced: false,
            pending: Vec::new(),
            pending_pos: 0,
        })
    }

    fn format(&mut self) -> Result<StreamFormat> {
        if !self.is_open() {
            return Err(Error::invalid_state("Source closed"));
        }

        // Headers may not carry everything; the first decoded frame does.
        let incomplete = self.sample_rate.is_none()
            || self.channels.is_none()
            || self.native == SampleFormat::Unknown;
        if incomplete {
            self.prime()?;
        }

        match (self.sample_rate, self.channels) {
            (Some(sample_rate), Some(channels)) if sample_rate > 0 && channels > 0 => {
                Ok(StreamFormat {
                    sample_rate,
                    channels,
                    encoding: self.native,
                })
            }
            _ => Err(Error::format("Could not determine stream format")),
        }
    }

    fn set_output_encoding(&mut self, encoding: SampleFormat) -> Result<()> {
        if !encoding.is_output_format() {
            return Err(Error::unsupported(format!(
                "Output encoding not supported: {}",
                encoding
            )));
        }
        if self.output != encoding {
            debug!("Output encoding {} -> {}", self.output, encoding);
            self.output = encoding;
        }
        self.output_forced = true;
        Ok(())
    }

    fn output_encoding(&self) -> SampleFormat {
        self.output
    }

    fn length(&mut self) -> Option<u64> {
        if let Some(frames) = self.n_frames {
            return Some(frames);
        }

        // No declared length: estimate from file size and the bitrate of the
        // first frame.
        let byte_len = self.byte_len?;
        let kbps = self.bitrate_kbps()?;
        let rate = self.sample_rate?;
        let estimate = estimate_length(byte_len, kbps, rate)?;
        debug!("Estimated length: {} frames", estimate);
        Some(estimate)
    }

    fn read(&mut self, buf: &mut [u8]) -> ReadOutcome {
        if !self.is_open() {
            return ReadOutcome::error(0);
        }

        let sample_size = self.output.sample_size();
        let capacity = buf.len() / sample_size;
        let mut written = 0;

        while written < capacity {
            let available = self.pending.len() - self.pending_pos;
            if available > 0 {
                let count = available.min(capacity - written);
                let start = written * sample_size;
                self.write_pending(&mut buf[start..start + count * sample_size], count);
                written += count;
                continue;
            }

            self.pending.clear();
            self.pending_pos = 0;
            match self.decode_next() {
                DecodeStep::Decoded => {}
                DecodeStep::End => return ReadOutcome::done(written * sample_size),
                DecodeStep::Failed => return ReadOutcome::error(written * sample_size),
            }
        }

        ReadOutcome::ok(written * sample_size)
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!("Closed decode session");
        }
        self.decoder = None;
        self.pending = Vec::new();
        self.pending_pos = 0;
    }
}

impl Drop for SymphoniaSource {
    fn drop(&mut self) {
        self.close();
    }
}
