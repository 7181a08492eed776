//! WAV audio output
//!
//! Writes RIFF/WAVE files holding 16-bit PCM or 32-bit float samples. Used to
//! dump decoded audio and to build synthetic sources.

pub mod header;
pub mod writer;

pub use header::{FormatTag, WavFormat};
pub use writer::WavWriter;

/// WAV format magic numbers
pub const RIFF_MAGIC: &[u8; 4] = b"RIFF";
pub const WAVE_MAGIC: &[u8; 4] = b"WAVE";
pub const FMT_CHUNK: &[u8; 4] = b"fmt ";
pub const DATA_CHUNK: &[u8; 4] = b"data";
