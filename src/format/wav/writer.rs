//! WAV file writer

use super::header::WavFormat;
use super::{DATA_CHUNK, FMT_CHUNK, RIFF_MAGIC, WAVE_MAGIC};
use crate::error::{Error, Result};
use crate::util::SampleFormat;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Streaming WAV writer.
///
/// The RIFF and data sizes are written as placeholders and patched by
/// [`finalize`](WavWriter::finalize).
pub struct WavWriter {
    writer: BufWriter<File>,
    format: WavFormat,
    sample_fmt: SampleFormat,
    riff_size_position: u64,
    data_size_position: u64,
    data_bytes: u64,
}

impl WavWriter {
    /// Create a WAV file and write its header
    pub fn create(
        path: &Path,
        sample_rate: u32,
        channels: u16,
        sample_fmt: SampleFormat,
    ) -> Result<Self> {
        let format = WavFormat::new(sample_rate, channels, sample_fmt)?;

        let file = File::create(path)
            .map_err(|e| Error::format(format!("Failed to create WAV file: {}", e)))?;
        let mut writer = BufWriter::new(file);

        writer.write_all(RIFF_MAGIC)?;
        let riff_size_position = writer.stream_position()?;
        writer.write_all(&0u32.to_le_bytes())?;
        writer.write_all(WAVE_MAGIC)?;

        let fmt_data = format.to_bytes();
        writer.write_all(FMT_CHUNK)?;
        writer.write_all(&(fmt_data.len() as u32).to_le_bytes())?;
        writer.write_all(&fmt_data)?;

        writer.write_all(DATA_CHUNK)?;
        let data_size_position = writer.stream_position()?;
        writer.write_all(&0u32.to_le_bytes())?;

        Ok(WavWriter {
            writer,
            format,
            sample_fmt,
            riff_size_position,
            data_size_position,
            data_bytes: 0,
        })
    }

    /// Append interleaved 16-bit samples
    pub fn write_i16(&mut self, samples: &[i16]) -> Result<()> {
        if self.sample_fmt != SampleFormat::I16 {
            return Err(Error::invalid_input("Writer expects f32 samples"));
        }
        for sample in samples {
            self.writer.write_all(&sample.to_le_bytes())?;
        }
        self.data_bytes += samples.len() as u64 * 2;
        Ok(())
    }

    /// Append interleaved 32-bit float samples
    pub fn write_f32(&mut self, samples: &[f32]) -> Result<()> {
        if self.sample_fmt != SampleFormat::F32 {
            return Err(Error::invalid_input("Writer expects i16 samples"));
        }
        for sample in samples {
            self.writer.write_all(&sample.to_le_bytes())?;
        }
        self.data_bytes += samples.len() as u64 * 4;
        Ok(())
    }

    /// Number of complete sample-frames written so far
    pub fn frames_written(&self) -> u64 {
        self.data_bytes / self.format.block_align as u64
    }

    /// Patch the chunk sizes and flush
    pub fn finalize(mut self) -> Result<()> {
        let data_size = u32::try_from(self.data_bytes)
            .map_err(|_| Error::format("WAV data exceeds 4 GiB"))?;

        self.writer.seek(SeekFrom::Start(self.data_size_position))?;
        self.writer.write_all(&data_size.to_le_bytes())?;

        // RIFF size = 4 (WAVE) + 8 (fmt header) + fmt data + 8 (data header) + data
        let fmt_data_size = self.format.to_bytes().len() as u32;
        let riff_size = 4 + 8 + fmt_data_size + 8 + data_size;
        self.writer.seek(SeekFrom::Start(self.riff_size_position))?;
        self.writer.write_all(&riff_size.to_le_bytes())?;

        self.writer.flush()?;
        Ok(())
    }
}
