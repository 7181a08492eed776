//! Audio sample format definitions

use std::fmt;

/// Interleaved audio sample format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    /// Unsigned 8-bit
    U8,
    /// Signed 16-bit
    I16,
    /// Signed 32-bit
    I32,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Unknown format
    #[default]
    Unknown,
}

impl SampleFormat {
    /// Get the size in bytes of one sample
    pub fn sample_size(&self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::I16 => 2,
            SampleFormat::I32 | SampleFormat::F32 => 4,
            SampleFormat::F64 => 8,
            SampleFormat::Unknown => 0,
        }
    }

    /// Whether a decode engine can be asked to emit this format
    pub fn is_output_format(&self) -> bool {
        matches!(self, SampleFormat::I16 | SampleFormat::F32)
    }
}

impl From<symphonia::core::sample::SampleFormat> for SampleFormat {
    fn from(fmt: symphonia::core::sample::SampleFormat) -> Self {
        use symphonia::core::sample::SampleFormat as Sym;
        match fmt {
            Sym::U8 => SampleFormat::U8,
            Sym::S16 => SampleFormat::I16,
            Sym::S32 => SampleFormat::I32,
            Sym::F32 => SampleFormat::F32,
            Sym::F64 => SampleFormat::F64,
            _ => SampleFormat::Unknown,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::U8 => "u8",
            SampleFormat::I16 => "s16",
            SampleFormat::I32 => "s32",
            SampleFormat::F32 => "f32",
            SampleFormat::F64 => "f64",
            SampleFormat::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}
