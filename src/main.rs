//! notewave CLI
//!
//! Command-line access to waveform peaks, stream info, and MP3 transcoding

use clap::{Parser, Subcommand};
use notewave_lib::codec::{Decoder, Mp3Decoder};
use notewave_lib::format::WavWriter;
use notewave_lib::util::SampleFormat;
use notewave_lib::waveform::{extract_peaks_batch, DEFAULT_PEAK_COUNT};
use notewave_lib::{init, Config};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "notewave")]
#[command(about = "notewave - voice note codec tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Number of threads to use
    #[arg(short = 't', long)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract normalised volume peaks
    Peaks {
        /// Input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Number of peaks per file
        #[arg(short = 'n', long, default_value_t = DEFAULT_PEAK_COUNT)]
        count: usize,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show stream information
    Info {
        /// Input file path
        input: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the duration in seconds
    Duration {
        /// Input file path
        input: PathBuf,
    },

    /// Decode to a 16-bit WAV file
    Decode {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Encode any decodable file to MP3
    #[cfg(feature = "lame")]
    Encode {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Output MP3 path
        #[arg(short, long)]
        output: PathBuf,

        /// Bitrate in kbit/s
        #[arg(short, long, default_value = "128")]
        bitrate: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config {
        max_threads: cli.threads,
        verbose: cli.verbose,
        debug: cli.debug,
    };

    init(config)?;

    info!("notewave v{}", notewave_lib::VERSION);

    match cli.command {
        Commands::Peaks {
            inputs,
            count,
            json,
        } => {
            cmd_peaks(&inputs, count, json)?;
        }
        Commands::Info { input, json } => {
            cmd_info(&input, json)?;
        }
        Commands::Duration { input } => {
            let seconds = notewave_lib::codec::mp3::duration(&input)?;
            println!("{:.3}", seconds);
        }
        Commands::Decode { input, output } => {
            info!("Decoding {} -> {}", input.display(), output.display());
            cmd_decode(&input, &output)?;
        }
        #[cfg(feature = "lame")]
        Commands::Encode {
            input,
            output,
            bitrate,
        } => {
            info!("Encoding {} -> {}", input.display(), output.display());
            cmd_encode(&input, &output, bitrate)?;
        }
    }

    Ok(())
}

fn cmd_peaks(inputs: &[PathBuf], count: usize, json: bool) -> anyhow::Result<()> {
    let results = extract_peaks_batch(inputs, count);
    let mut failures = 0;

    if json {
        let entries: Vec<serde_json::Value> = inputs
            .iter()
            .zip(&results)
            .map(|(path, result)| match result {
                Ok(peaks) => serde_json::json!({
                    "file": path.display().to_string(),
                    "peaks": peaks,
                }),
                Err(e) => {
                    failures += 1;
                    serde_json::json!({
                        "file": path.display().to_string(),
                        "error": e.to_string(),
                    })
                }
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for (path, result) in inputs.iter().zip(&results) {
            match result {
                Ok(peaks) => {
                    let line: Vec<String> = peaks.iter().map(|p| format!("{:.3}", p)).collect();
                    println!("{}: {}", path.display(), line.join(" "));
                }
                Err(e) => {
                    failures += 1;
                    eprintln!("{}: {}", path.display(), e);
                }
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} files failed", failures, inputs.len());
    }
    Ok(())
}

fn cmd_info(input: &Path, json: bool) -> anyhow::Result<()> {
    let mut decoder = Mp3Decoder::open(input)?;
    let stats = decoder.stats()?.clone();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("File: {}", input.display());
    println!("  Sample Rate: {} Hz", stats.sample_rate);
    println!("  Channels: {}", stats.channels);
    println!("  Bit Rate: {} kbps", stats.bitrate_kbps);
    match stats.num_samples {
        Some(n) if stats.length_estimated => println!("  Samples: ~{} (estimated)", n),
        Some(n) => println!("  Samples: {}", n),
        None => println!("  Samples: unknown"),
    }
    println!("  Samples Per Frame: {}", stats.samples_per_frame);
    println!("  Frames: {}", stats.total_frames);
    println!("  Duration: {:.2}s", stats.duration_secs);

    Ok(())
}

fn cmd_decode(input: &Path, output: &Path) -> anyhow::Result<()> {
    let mut decoder = Mp3Decoder::open(input)?;
    let stats = decoder.stats()?.clone();
    let channels = stats.channels.min(2);

    let mut writer = WavWriter::create(output, stats.sample_rate, channels, SampleFormat::I16)?;
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut interleaved = Vec::new();

    loop {
        let n = decoder.decode(&mut left, &mut right)?;
        if n == 0 {
            break;
        }
        if channels == 1 {
            writer.write_i16(&left[..n])?;
        } else {
            interleaved.clear();
            for (l, r) in left[..n].iter().zip(&right[..n]) {
                interleaved.push(*l);
                interleaved.push(*r);
            }
            writer.write_i16(&interleaved)?;
        }
    }

    let frames = writer.frames_written();
    writer.finalize()?;
    decoder.close();

    println!("Wrote {} frames to {}", frames, output.display());
    Ok(())
}

#[cfg(feature = "lame")]
fn cmd_encode(input: &Path, output: &Path, bitrate: u32) -> anyhow::Result<()> {
    use notewave_lib::codec::{DecodeEngine, Encoder, Mp3Encoder, Mp3EncoderConfig, ReadStatus};
    use notewave_lib::format::SymphoniaSource;
    use std::io::Write;

    let mut source = SymphoniaSource::open(input)?;
    let format = source.format()?;
    source.set_output_encoding(SampleFormat::I16)?;

    let mut encoder = Mp3Encoder::with_config(Mp3EncoderConfig {
        sample_rate: format.sample_rate,
        channels: format.channels,
        bitrate_kbps: bitrate,
        ..Default::default()
    })?;

    let mut pcm = vec![0i16; 4096 * format.channels as usize];
    let mut mp3 = Vec::new();
    loop {
        let outcome = source.read(bytemuck::cast_slice_mut(&mut pcm));
        let samples = outcome.bytes / 2;
        if samples > 0 {
            encoder.encode(&pcm[..samples], &mut mp3)?;
        }
        match outcome.status {
            ReadStatus::Ok => {}
            ReadStatus::Done => break,
            ReadStatus::Error => anyhow::bail!("Failed to decode {}", input.display()),
        }
    }
    encoder.flush(&mut mp3)?;
    encoder.close();

    let mut file = std::fs::File::create(output)?;
    file.write_all(&mp3)?;

    println!("Wrote {} bytes to {}", mp3.len(), output.display());
    Ok(())
}
