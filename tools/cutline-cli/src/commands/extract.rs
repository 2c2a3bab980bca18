//! Clip, frame, frame-sequence and audio extraction.

use std::path::PathBuf;

use cutline_media_model::FrameRate;
use serde::Serialize;

use super::{parse_box, time_range, Context};

pub fn clip(
    ctx: &Context,
    source: PathBuf,
    start: f64,
    end: f64,
    buffer: f64,
    output: PathBuf,
) -> anyhow::Result<()> {
    let report = ctx
        .engine()
        .extract_clip(&source, time_range(start, end)?, buffer, &output)?;

    ctx.emit(&report, |r| {
        println!("Clip written: {}", r.output.display());
        println!(
            "  Frames {}..={} ({} frames, {:.3}s)",
            r.frame_range.start_frame, r.frame_range.end_frame, r.frame_count, r.duration_secs
        );
    })
}

pub fn frame(
    ctx: &Context,
    source: PathBuf,
    at: f64,
    crop: Option<String>,
    output: PathBuf,
) -> anyhow::Result<()> {
    let crop = crop.as_deref().map(parse_box).transpose()?;
    let frame = ctx.engine().extract_frame(&source, at, crop, &output)?;

    ctx.emit(&frame, |f| {
        println!("Frame {} written: {}", f.frame, f.output.display());
        println!("  Size: {}x{}", f.width, f.height);
    })
}

#[derive(Serialize)]
struct FramesReport {
    dir: PathBuf,
    count: usize,
    first: Option<PathBuf>,
    last: Option<PathBuf>,
}

pub fn frames(
    ctx: &Context,
    source: PathBuf,
    fps: Option<FrameRate>,
    start: Option<f64>,
    duration: Option<f64>,
    output: PathBuf,
) -> anyhow::Result<()> {
    let frames = ctx
        .engine()
        .extract_frames(&source, &output, fps, start, duration)?;
    let report = FramesReport {
        dir: output,
        count: frames.len(),
        first: frames.first().cloned(),
        last: frames.last().cloned(),
    };

    ctx.emit(&report, |r| {
        println!("{} frames written to {}", r.count, r.dir.display());
    })
}

#[derive(Serialize)]
struct AudioReport {
    output: Option<PathBuf>,
}

pub fn audio(ctx: &Context, source: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let report = AudioReport {
        output: ctx.engine().extract_audio(&source, &output)?,
    };

    ctx.emit(&report, |r| match &r.output {
        Some(path) => println!("Audio written: {}", path.display()),
        None => println!("{} has no audio track", source.display()),
    })
}
