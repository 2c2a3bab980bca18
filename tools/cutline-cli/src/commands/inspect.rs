//! Show stream properties.

use std::path::PathBuf;

use super::Context;

pub fn run(ctx: &Context, path: PathBuf) -> anyhow::Result<()> {
    let info = ctx.engine().inspect(&path)?;

    ctx.emit(&info, |i| {
        println!("Media: {}", path.display());
        println!(
            "  Video: {} {}x{} @ {} fps ({:.3})",
            i.video_codec,
            i.width,
            i.height,
            i.frame_rate,
            i.frame_rate.as_f64()
        );
        if let Some(pix) = &i.pixel_format {
            println!("  Pixel format: {pix}");
        }
        println!("  Duration: {:.3}s ({} frames)", i.duration_secs, i.total_frames);
        if i.has_audio {
            println!(
                "  Audio: {} {} Hz, {} ch",
                i.audio_codec.as_deref().unwrap_or("unknown"),
                i.audio_sample_rate.map_or("?".to_string(), |v| v.to_string()),
                i.audio_channels.map_or("?".to_string(), |v| v.to_string()),
            );
        } else {
            println!("  Audio: none");
        }
    })
}
