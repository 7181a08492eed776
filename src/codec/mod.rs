//! Codec layer: the decode engine contract, decoder and encoder traits, and
//! the MP3 implementations

pub mod decoder;
pub mod encoder;
pub mod engine;
pub mod mp3;

pub use decoder::Decoder;
pub use encoder::{EncodeQuality, Encoder, Mp3EncoderConfig};
pub use engine::{DecodeEngine, ReadOutcome, ReadStatus, StreamFormat};
pub use mp3::{Mp3Decoder, StreamStats};

#[cfg(feature = "lame")]
pub use mp3::Mp3Encoder;
