//! Decode engine contract
//!
//! A decode engine turns a compressed audio file into interleaved PCM. The
//! peak extractor and the streaming decoder only talk to the engine through
//! this trait, so tests can drive them with synthetic sources.

use crate::error::Result;
use crate::util::SampleFormat;
use std::path::Path;

/// Stream parameters reported by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Encoding the source decodes to natively
    pub encoding: SampleFormat,
}

/// Status of a single [`DecodeEngine::read`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// More data may follow
    Ok,
    /// The stream is exhausted; `bytes` holds the final partial fill
    Done,
    /// Unrecoverable decode error
    Error,
}

/// Result of a single read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes written into the caller's buffer
    pub bytes: usize,
    /// Engine status after the read
    pub status: ReadStatus,
}

impl ReadOutcome {
    pub fn ok(bytes: usize) -> Self {
        ReadOutcome {
            bytes,
            status: ReadStatus::Ok,
        }
    }

    pub fn done(bytes: usize) -> Self {
        ReadOutcome {
            bytes,
            status: ReadStatus::Done,
        }
    }

    pub fn error(bytes: usize) -> Self {
        ReadOutcome {
            bytes,
            status: ReadStatus::Error,
        }
    }
}

/// A streaming decode session bound to one audio source.
///
/// Sessions are owned values: dropping one releases everything it holds.
/// `close` exists for callers that want to release early and must be safe to
/// call any number of times.
pub trait DecodeEngine {
    /// Open a source by path
    fn open(path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Query the stream format, decoding ahead if the headers alone do not
    /// carry it
    fn format(&mut self) -> Result<StreamFormat>;

    /// Force the encoding produced by [`read`](Self::read).
    ///
    /// Only [`SampleFormat::I16`] and [`SampleFormat::F32`] are accepted.
    fn set_output_encoding(&mut self, encoding: SampleFormat) -> Result<()>;

    /// Encoding currently produced by [`read`](Self::read)
    fn output_encoding(&self) -> SampleFormat;

    /// Total length in sample-frames, if known
    fn length(&mut self) -> Option<u64>;

    /// Fill `buf` with interleaved native-endian samples in the output
    /// encoding. Blocks until the buffer is full, the stream ends, or an
    /// unrecoverable error occurs.
    fn read(&mut self, buf: &mut [u8]) -> ReadOutcome;

    /// Release the session
    fn close(&mut self);
}
