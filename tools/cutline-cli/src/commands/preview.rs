//! GIF previews.

use std::path::PathBuf;

use cutline_media_engine::GifOptions;

use super::{time_range, Context};

pub fn run(
    ctx: &Context,
    source: PathBuf,
    range: (Option<f64>, Option<f64>),
    options: GifOptions,
    output: PathBuf,
) -> anyhow::Result<()> {
    let range = match range {
        (Some(start), Some(end)) => Some(time_range(start, end)?),
        (None, None) => None,
        _ => anyhow::bail!("pass both --start and --end, or neither"),
    };
    let report = ctx
        .engine()
        .preview_gif(&source, range, &options, &output)?;

    ctx.emit(&report, |r| {
        println!("Preview written: {}", r.output.display());
        println!(
            "  From frame {}, {:.2}s at {} fps, {} px wide",
            r.frame_range.start_frame, r.duration_secs, options.fps, options.width
        );
    })
}
