//! Cutline CLI — frame-accurate splicing, masking and extraction.
//!
//! Usage:
//!   cutline check                         Check the media backend
//!   cutline inspect <FILE>                Show stream properties
//!   cutline splice <ORIG> <REPL> ...      Replace a time range with a clip
//!   cutline composite <SRC> <MASK> ...    Blur or pixelate a masked region
//!   cutline track <FINDINGS> ...          Track seed boxes across frames
//!   cutline masks <FINDINGS> ...          Rasterize tracked paths to masks
//!   cutline preview <FILE> -o <GIF>       Render a looping GIF preview

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cutline_common::config::AppConfig;
use cutline_media_engine::GifOptions;
use cutline_media_model::{FrameRate, Resolution};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(
    name = "cutline",
    about = "Frame-accurate video splicing, masked effects and region tracking",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: $XDG_CONFIG_HOME/cutline/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that ffmpeg and ffprobe are usable
    Check {
        /// Write the effective configuration to the standard location
        #[arg(long)]
        write_config: bool,
    },

    /// Show stream properties of a media file
    Inspect {
        /// Media file
        path: PathBuf,
    },

    /// Extract a time range as a standalone clip
    ExtractClip {
        source: PathBuf,

        /// Range start (seconds)
        #[arg(long)]
        start: f64,

        /// Range end (seconds, inclusive frame)
        #[arg(long)]
        end: f64,

        /// Seconds added on both sides of the range
        #[arg(long, default_value = "0.0")]
        buffer: f64,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Extract the frame at a timestamp as an image
    ExtractFrame {
        source: PathBuf,

        /// Timestamp (seconds)
        #[arg(long)]
        at: f64,

        /// Crop box in percent: top,left,width,height
        #[arg(long)]
        crop: Option<String>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Decode a numbered frame_%06d.png sequence
    ExtractFrames {
        source: PathBuf,

        /// Sampling rate (default: the source's own rate)
        #[arg(long)]
        fps: Option<FrameRate>,

        /// Start offset (seconds)
        #[arg(long)]
        start: Option<f64>,

        /// Duration (seconds)
        #[arg(long)]
        duration: Option<f64>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Copy the audio track out of a file
    ExtractAudio {
        source: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Resample a clip to a frame rate and optional resolution
    Normalize {
        clip: PathBuf,

        /// Target rate, e.g. 30, 29.97 or 30000/1001
        #[arg(long)]
        fps: FrameRate,

        /// Target resolution WxH (letterboxed)
        #[arg(long)]
        resolution: Option<Resolution>,

        /// Drop the audio track
        #[arg(long)]
        no_audio: bool,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Replace a time range of the original with a replacement clip
    Splice {
        original: PathBuf,
        replacement: PathBuf,

        /// Range start (seconds)
        #[arg(long)]
        start: f64,

        /// Range end (seconds, inclusive frame)
        #[arg(long)]
        end: f64,

        /// Seconds added on both sides of the range
        #[arg(long, default_value = "0.0")]
        buffer: f64,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Join clips that share one encoding
    Concat {
        #[arg(required = true)]
        clips: Vec<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Apply an effect only where the mask is white
    Composite {
        source: PathBuf,

        /// Mask video or image (white = alter)
        mask: PathBuf,

        /// Effect: blur|pixelate
        #[arg(long, default_value = "blur")]
        effect: String,

        /// Blur radius or pixel block size
        #[arg(long, default_value = "20")]
        intensity: u32,

        /// Replacement audio track
        #[arg(long)]
        audio: Option<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Track findings' seed boxes through a frame sequence
    Track {
        /// Findings JSON (array)
        findings: PathBuf,

        /// Directory of frame_*.png files
        #[arg(long)]
        frames: PathBuf,

        /// Frame rate of the sequence
        #[arg(long)]
        fps: FrameRate,

        /// Where to write the tracked findings (default: in place)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rasterize a tracked finding into mask frames
    Masks {
        /// Tracked findings JSON (array)
        findings: PathBuf,

        /// Finding id (default: the first tracked finding)
        #[arg(long)]
        id: Option<String>,

        /// Mask resolution WxH
        #[arg(long, conflicts_with = "like")]
        resolution: Option<Resolution>,

        /// Take the mask resolution from this video
        #[arg(long)]
        like: Option<PathBuf>,

        /// First frame to write (default: start of the path)
        #[arg(long)]
        from_frame: Option<u64>,

        /// Last frame to write (default: end of the path)
        #[arg(long)]
        to_frame: Option<u64>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Render a looping GIF preview of a clip or range
    Preview {
        source: PathBuf,

        /// Range start (seconds; requires --end)
        #[arg(long, requires = "end")]
        start: Option<f64>,

        /// Range end (seconds, inclusive frame)
        #[arg(long, requires = "start")]
        end: Option<f64>,

        /// Preview frame rate
        #[arg(long, default_value = "10")]
        fps: u32,

        /// Preview width in pixels
        #[arg(long, default_value = "320")]
        width: u32,

        /// Longest preview in seconds
        #[arg(long, default_value = "3.0")]
        max_secs: f64,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Encode a frame_%06d.png sequence into a video
    Assemble {
        frames: PathBuf,

        #[arg(long)]
        fps: FrameRate,

        /// Audio track to mux
        #[arg(long)]
        audio: Option<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    cutline_common::logging::init_logging(&config.logging)?;

    let ctx = Context::new(config, cli.json);

    match cli.command {
        Commands::Check { write_config } => commands::check::run(&ctx, write_config),
        Commands::Inspect { path } => commands::inspect::run(&ctx, path),
        Commands::ExtractClip {
            source,
            start,
            end,
            buffer,
            output,
        } => commands::extract::clip(&ctx, source, start, end, buffer, output),
        Commands::ExtractFrame {
            source,
            at,
            crop,
            output,
        } => commands::extract::frame(&ctx, source, at, crop, output),
        Commands::ExtractFrames {
            source,
            fps,
            start,
            duration,
            output,
        } => commands::extract::frames(&ctx, source, fps, start, duration, output),
        Commands::ExtractAudio { source, output } => {
            commands::extract::audio(&ctx, source, output)
        }
        Commands::Normalize {
            clip,
            fps,
            resolution,
            no_audio,
            output,
        } => commands::normalize::run(&ctx, clip, fps, resolution, no_audio, output),
        Commands::Splice {
            original,
            replacement,
            start,
            end,
            buffer,
            output,
        } => commands::splice::run(&ctx, original, replacement, start, end, buffer, output),
        Commands::Concat { clips, output } => commands::splice::concat(&ctx, clips, output),
        Commands::Composite {
            source,
            mask,
            effect,
            intensity,
            audio,
            output,
        } => commands::composite::run(&ctx, source, mask, &effect, intensity, audio, output),
        Commands::Track {
            findings,
            frames,
            fps,
            output,
        } => commands::track::run(&ctx, findings, frames, fps, output).await,
        Commands::Masks {
            findings,
            id,
            resolution,
            like,
            from_frame,
            to_frame,
            output,
        } => commands::track::masks(
            &ctx,
            findings,
            id,
            resolution,
            like,
            (from_frame, to_frame),
            output,
        ),
        Commands::Preview {
            source,
            start,
            end,
            fps,
            width,
            max_secs,
            output,
        } => commands::preview::run(
            &ctx,
            source,
            (start, end),
            GifOptions {
                fps,
                width,
                max_secs,
            },
            output,
        ),
        Commands::Assemble {
            frames,
            fps,
            audio,
            output,
        } => commands::assemble::run(&ctx, frames, fps, audio, output),
    }
}
