//! Encode a frame sequence.

use std::path::PathBuf;

use cutline_media_model::FrameRate;
use serde::Serialize;

use super::Context;

#[derive(Serialize)]
struct AssembleReport {
    output: PathBuf,
    frame_rate: FrameRate,
}

pub fn run(
    ctx: &Context,
    frames: PathBuf,
    fps: FrameRate,
    audio: Option<PathBuf>,
    output: PathBuf,
) -> anyhow::Result<()> {
    let report = AssembleReport {
        output: ctx
            .engine()
            .assemble_frames(&frames, &output, fps, audio.as_deref())?,
        frame_rate: fps,
    };

    ctx.emit(&report, |r| {
        println!("Assembled at {} fps: {}", r.frame_rate, r.output.display());
    })
}
