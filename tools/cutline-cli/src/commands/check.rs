//! Check the media backend.

use cutline_common::config::config_file_path;
use cutline_media_engine::{FfmpegCli, MediaBackend};
use serde::Serialize;

use super::Context;

#[derive(Serialize)]
struct CheckReport {
    backend: String,
    ffmpeg: String,
    ffprobe: String,
    available: bool,
    config_file: String,
    config_file_exists: bool,
}

pub fn run(ctx: &Context, write_config: bool) -> anyhow::Result<()> {
    if write_config {
        let path = ctx.config.save()?;
        tracing::info!(path = %path.display(), "Wrote config");
    }
    let backend = FfmpegCli::new(&ctx.config.backend);
    let config_file = config_file_path();
    let report = CheckReport {
        backend: backend.name().to_string(),
        ffmpeg: ctx.config.backend.ffmpeg_path.clone(),
        ffprobe: ctx.config.backend.ffprobe_path.clone(),
        available: backend.is_available(),
        config_file: config_file.display().to_string(),
        config_file_exists: config_file.exists(),
    };

    ctx.emit(&report, |r| {
        println!("Cutline System Check");
        println!("{}", "=".repeat(50));
        let status = if r.available { "OK" } else { "MISSING" };
        println!("[{status}] Media backend: {} ({}, {})", r.backend, r.ffmpeg, r.ffprobe);
        let config = if r.config_file_exists { "found" } else { "defaults" };
        println!("[OK] Config: {} ({config})", r.config_file);
        println!();
        if r.available {
            println!("All required tools are available. Cutline is ready.");
        } else {
            println!("ffmpeg/ffprobe could not be run. Install them or set backend paths in the config.");
        }
    })?;

    if !report.available {
        anyhow::bail!("media backend unavailable");
    }
    Ok(())
}
