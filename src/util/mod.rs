//! Common utilities and data structures

pub mod samplefmt;

pub use samplefmt::SampleFormat;
