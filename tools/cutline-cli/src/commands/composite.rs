//! Masked effects.

use std::path::PathBuf;

use cutline_media_engine::{CompositeRequest, MaskEffect};
use serde::Serialize;

use super::Context;

#[derive(Serialize)]
struct CompositeReport {
    output: PathBuf,
    #[serde(flatten)]
    effect: MaskEffect,
}

pub fn run(
    ctx: &Context,
    source: PathBuf,
    mask: PathBuf,
    effect: &str,
    intensity: u32,
    audio: Option<PathBuf>,
    output: PathBuf,
) -> anyhow::Result<()> {
    let effect = MaskEffect::from_name(effect, intensity)?;
    let request = CompositeRequest {
        source,
        mask,
        effect,
        audio,
        output,
    };
    let report = CompositeReport {
        output: ctx.engine().apply_masked_effect(&request)?,
        effect,
    };

    ctx.emit(&report, |r| {
        println!("Masked {:?} written: {}", r.effect, r.output.display());
    })
}
