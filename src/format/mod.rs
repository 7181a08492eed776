//! Container access: Symphonia-backed reading and WAV writing

pub mod symphonia_adapter;
pub mod wav;

pub use symphonia_adapter::SymphoniaSource;
pub use wav::WavWriter;
