//! Resample a clip.

use std::path::PathBuf;

use cutline_media_engine::{AudioHandling, NormalizeOptions};
use cutline_media_model::{FrameRate, Resolution};

use super::Context;

pub fn run(
    ctx: &Context,
    clip: PathBuf,
    fps: FrameRate,
    resolution: Option<Resolution>,
    no_audio: bool,
    output: PathBuf,
) -> anyhow::Result<()> {
    let mut options = NormalizeOptions::new(fps);
    if let Some(resolution) = resolution {
        options = options.with_resolution(resolution);
    }
    if no_audio {
        options = options.with_audio(AudioHandling::Drop);
    }

    let report = ctx.engine().normalize(&clip, &output, &options)?;

    ctx.emit(&report, |r| {
        if r.passthrough {
            println!("Already at {fps} fps; copied to {}", r.output.display());
        } else {
            println!("Normalized to {fps} fps: {}", r.output.display());
        }
    })
}
