//! notewave - audio codec glue for voice notes
//!
//! notewave wraps an MP3 decode engine (Symphonia) and an MP3 encode engine
//! (libmp3lame, behind the `lame` feature) and builds waveform data on top of
//! them.
//!
//! # Architecture
//!
//! - `codec`: the decode engine contract, the streaming MP3 decoder with its
//!   stats cache, and the MP3 encoder
//! - `format`: the Symphonia-backed engine and a WAV writer
//! - `waveform`: volume peak extraction and recording summaries
//! - `util`: sample formats
//!
//! Every decode session is an owned value released on drop, so independent
//! extractions can run concurrently without shared library state.

pub mod codec;
pub mod error;
pub mod format;
pub mod util;
pub mod waveform;

pub use error::{Error, Result};
pub use waveform::{extract_peaks, summarize, PeakConfig, PeakExtractor, WaveformSummary};

/// notewave version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for the notewave library
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Maximum number of threads for batch extraction
    pub max_threads: Option<usize>,
    /// Enable verbose logging
    pub verbose: bool,
    /// Enable debug output
    pub debug: bool,
}

/// Initialize the notewave library with the given configuration.
///
/// Safe to call more than once: the thread pool and the log subscriber are
/// only installed by the first call that asks for them.
pub fn init(config: Config) -> Result<()> {
    if let Some(threads) = config.max_threads {
        if threads == 0 {
            return Err(Error::Config("Thread count must be positive".into()));
        }
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            tracing::debug!("Thread pool already initialized: {}", e);
        }
    }

    if config.verbose || config.debug {
        let level = if config.debug { "debug" } else { "info" };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(level)
            .with_writer(std::io::stderr)
            .try_init();
    }

    Ok(())
}
