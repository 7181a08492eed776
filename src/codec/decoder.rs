//! Decoder trait

use crate::error::Result;

/// Pull decoder producing 16-bit PCM split into left and right channels
pub trait Decoder {
    /// Decode the next frame into `left` and `right`.
    ///
    /// Returns the number of samples per channel, or 0 at end of stream.
    /// Buffers shorter than the frame are grown; longer ones keep their
    /// length and only the first `n` samples are meaningful.
    fn decode(&mut self, left: &mut Vec<i16>, right: &mut Vec<i16>) -> Result<usize>;

    /// Release the decoder
    fn close(&mut self);
}
