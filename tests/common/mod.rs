//! Common test utilities for notewave integration tests
//!
//! Fixtures are written as WAV files through the crate's own writer; the
//! decode path through Symphonia is the same one MP3 input takes.

#![allow(dead_code)]

use notewave_lib::format::WavWriter;
use notewave_lib::util::SampleFormat;
use std::io::Write;
use tempfile::NamedTempFile;

pub const TEST_RATE: u32 = 8000;

// ============================================================================
// Signal Generation
// ============================================================================

/// Linear ramp from 0.0 towards 1.0 over `frames` samples
pub fn ramp(frames: usize) -> Vec<f32> {
    (0..frames).map(|i| i as f32 / frames as f32).collect()
}

/// 440 Hz sine at the given amplitude
pub fn sine(frames: usize, rate: u32, amplitude: f32) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            let t = i as f32 / rate as f32;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * amplitude
        })
        .collect()
}

/// Interleave two channels of equal length
pub fn interleave(left: &[f32], right: &[f32]) -> Vec<f32> {
    left.iter()
        .zip(right)
        .flat_map(|(l, r)| [*l, *r])
        .collect()
}

// ============================================================================
// File Fixtures
// ============================================================================

/// Write interleaved f32 samples to a temporary WAV file
pub fn write_f32_wav(samples: &[f32], rate: u32, channels: u16) -> NamedTempFile {
    let file = NamedTempFile::with_suffix(".wav").expect("Failed to create temp file");
    let mut writer = WavWriter::create(file.path(), rate, channels, SampleFormat::F32)
        .expect("Failed to create WAV writer");
    writer.write_f32(samples).expect("Failed to write samples");
    writer.finalize().expect("Failed to finalize WAV");
    file
}

/// Write interleaved 16-bit samples to a temporary WAV file
pub fn write_i16_wav(samples: &[i16], rate: u32, channels: u16) -> NamedTempFile {
    let file = NamedTempFile::with_suffix(".wav").expect("Failed to create temp file");
    let mut writer = WavWriter::create(file.path(), rate, channels, SampleFormat::I16)
        .expect("Failed to create WAV writer");
    writer.write_i16(samples).expect("Failed to write samples");
    writer.finalize().expect("Failed to finalize WAV");
    file
}

/// One second of mono ramp at [`TEST_RATE`]
pub fn ramp_wav() -> NamedTempFile {
    write_f32_wav(&ramp(TEST_RATE as usize), TEST_RATE, 1)
}

/// One second of mono silence at [`TEST_RATE`]
pub fn silence_wav() -> NamedTempFile {
    write_f32_wav(&vec![0.0; TEST_RATE as usize], TEST_RATE, 1)
}

/// Untagged constant-bitrate MP3 of silent mono frames (128 kbps, 44.1 kHz).
/// Below 17 frames the reader cannot estimate a length on its own.
pub fn silent_mp3(frames: usize) -> NamedTempFile {
    let mut frame = vec![0u8; 417];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0xC0]);

    let mut file = NamedTempFile::with_suffix(".mp3").expect("Failed to create temp file");
    for _ in 0..frames {
        file.write_all(&frame).expect("Failed to write frame");
    }
    file.flush().expect("Failed to flush");
    file
}

/// A file with an audio extension but no decodable content
pub fn garbage_file() -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".mp3").expect("Failed to create temp file");
    file.write_all(&[0x5a; 2048]).expect("Failed to write garbage");
    file.flush().expect("Failed to flush");
    file
}

// ============================================================================
// Assertions
// ============================================================================

/// Assert every peak lies in the normalised range
pub fn assert_normalised(peaks: &[f32]) {
    for (i, peak) in peaks.iter().enumerate() {
        assert!(
            (0.0..=1.0).contains(peak),
            "peak {} out of range: {}",
            i,
            peak
        );
    }
}

/// Assert two peak vectors agree within `tolerance`
pub fn assert_peaks_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len(), "peak count mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tolerance,
            "peak {}: expected {}, got {}",
            i,
            e,
            a
        );
    }
}
