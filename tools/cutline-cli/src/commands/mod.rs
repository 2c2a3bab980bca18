pub mod assemble;
pub mod check;
pub mod composite;
pub mod extract;
pub mod inspect;
pub mod normalize;
pub mod preview;
pub mod splice;
pub mod track;

use cutline_common::config::AppConfig;
use cutline_media_engine::MediaEngine;
use cutline_media_model::{BoundingBox, TimeRange};
use serde::Serialize;

/// Shared state for every subcommand.
pub struct Context {
    pub config: AppConfig,
    pub json: bool,
}

impl Context {
    pub fn new(config: AppConfig, json: bool) -> Self {
        Self { config, json }
    }

    pub fn engine(&self) -> MediaEngine {
        MediaEngine::new(&self.config)
    }

    /// Print `value` as JSON with `--json`, otherwise through `human`.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

pub fn time_range(start: f64, end: f64) -> anyhow::Result<TimeRange> {
    TimeRange::new(start, end).map_err(|e| anyhow::anyhow!("{e}"))
}

/// Parse `top,left,width,height` percentages.
pub fn parse_box(raw: &str) -> anyhow::Result<BoundingBox> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("invalid box '{raw}': {e}"))?;
    let [top, left, width, height] = parts[..] else {
        anyhow::bail!("box '{raw}' needs four values: top,left,width,height");
    };
    BoundingBox::new(top, left, width, height).map_err(|e| anyhow::anyhow!("{e}"))
}
