//! Splice and concatenate.

use std::path::PathBuf;

use cutline_media_engine::SpliceRequest;
use serde::Serialize;

use super::{time_range, Context};

pub fn run(
    ctx: &Context,
    original: PathBuf,
    replacement: PathBuf,
    start: f64,
    end: f64,
    buffer: f64,
    output: PathBuf,
) -> anyhow::Result<()> {
    let request = SpliceRequest {
        original,
        replacement,
        time_range: time_range(start, end)?,
        buffer_secs: buffer,
        output,
    };
    let report = ctx.engine().splice_replace(&request)?;

    ctx.emit(&report, |r| {
        println!("Spliced: {}", r.output.display());
        println!(
            "  Replaced frames {}..={}",
            r.frame_range.start_frame, r.frame_range.end_frame
        );
        for segment in &r.segments {
            println!(
                "  {:?}: {} frames ({:.3}s)",
                segment.role, segment.frame_count, segment.duration_secs
            );
        }
        println!(
            "  Total: {} frames, expected {:.3}s",
            r.total_frames(),
            r.expected_duration_secs
        );
    })
}

#[derive(Serialize)]
struct ConcatReport {
    output: PathBuf,
    clips: usize,
}

pub fn concat(ctx: &Context, clips: Vec<PathBuf>, output: PathBuf) -> anyhow::Result<()> {
    let report = ConcatReport {
        output: ctx.engine().concat_clips(&clips, &output)?,
        clips: clips.len(),
    };

    ctx.emit(&report, |r| {
        println!("Joined {} clip(s): {}", r.clips, r.output.display());
    })
}
