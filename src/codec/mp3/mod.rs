//! MP3 audio codec support
//!
//! Decoding goes through Symphonia's MPEG audio decoder; encoding goes
//! through libmp3lame and needs the `lame` feature.
//!
//! ## Usage
//!
//! ```no_run
//! use notewave_lib::codec::{Decoder, Mp3Decoder};
//! use std::path::Path;
//!
//! let mut decoder = Mp3Decoder::open(Path::new("note.mp3"))?;
//! let (mut left, mut right) = (Vec::new(), Vec::new());
//! while decoder.decode(&mut left, &mut right)? > 0 {
//!     // left/right hold one frame of 16-bit PCM
//! }
//! # Ok::<(), notewave_lib::Error>(())
//! ```

pub mod decoder;

#[cfg(feature = "lame")]
pub mod encoder;

pub use decoder::{duration, Mp3Decoder, StreamStats};

#[cfg(feature = "lame")]
pub use encoder::Mp3Encoder;
