//! Region tracking and mask rasterization.

use std::path::{Path, PathBuf};

use cutline_media_model::{Finding, FrameRange, FrameRate, Resolution, TrackingOutcome};
use cutline_region_tracker::{rasterize_masks, track_findings, ImageSequence};
use serde::Serialize;

use super::Context;

fn load_findings(path: &Path) -> anyhow::Result<Vec<Finding>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
    let findings: Vec<Finding> = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("cannot parse findings in {}: {e}", path.display()))?;
    for finding in &findings {
        finding
            .validate()
            .map_err(|e| anyhow::anyhow!("finding '{}': {e}", finding.id))?;
    }
    Ok(findings)
}

#[derive(Serialize)]
struct TrackSummary {
    id: String,
    points: usize,
    outcome: Option<TrackingOutcome>,
}

/// Track every finding, one tracker each, off the async runtime and write
/// the findings back with their paths.
pub async fn run(
    ctx: &Context,
    findings_path: PathBuf,
    frames_dir: PathBuf,
    fps: FrameRate,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let findings = load_findings(&findings_path)?;
    let frames = ImageSequence::open(&frames_dir)?;
    tracing::info!(
        findings = findings.len(),
        frames = %frames_dir.display(),
        rate = %fps,
        "Tracking findings"
    );

    let config = ctx.config.tracking.clone();
    let findings = tokio::task::spawn_blocking(move || {
        let mut findings = findings;
        track_findings(&mut findings, &frames, fps, &config);
        findings
    })
    .await?;

    let output = output.unwrap_or(findings_path);
    std::fs::write(&output, serde_json::to_string_pretty(&findings)?)?;

    let summary: Vec<TrackSummary> = findings
        .iter()
        .map(|f| TrackSummary {
            id: f.id.clone(),
            points: f.path.as_ref().map_or(0, |p| p.len()),
            outcome: f.path.as_ref().map(|p| p.outcome),
        })
        .collect();

    ctx.emit(&summary, |rows| {
        println!("Tracked {} finding(s) -> {}", rows.len(), output.display());
        for row in rows {
            let outcome = match row.outcome {
                Some(TrackingOutcome::Complete) => "complete".to_string(),
                Some(TrackingOutcome::Lost { frame }) => format!("lost at frame {frame}"),
                Some(TrackingOutcome::NoSeed) | None => "no seed".to_string(),
            };
            println!("  {}: {} point(s), {outcome}", row.id, row.points);
        }
    })
}

#[derive(Serialize)]
struct MasksReport {
    finding: String,
    dir: PathBuf,
    frames: usize,
    frame_range: FrameRange,
    resolution: Resolution,
}

pub fn masks(
    ctx: &Context,
    findings_path: PathBuf,
    id: Option<String>,
    resolution: Option<Resolution>,
    like: Option<PathBuf>,
    (from_frame, to_frame): (Option<u64>, Option<u64>),
    output: PathBuf,
) -> anyhow::Result<()> {
    let findings = load_findings(&findings_path)?;
    let finding = match &id {
        Some(id) => findings
            .iter()
            .find(|f| &f.id == id)
            .ok_or_else(|| anyhow::anyhow!("no finding with id '{id}'"))?,
        None => findings
            .iter()
            .find(|f| f.path.is_some())
            .ok_or_else(|| anyhow::anyhow!("no tracked finding in {}", findings_path.display()))?,
    };
    let path = finding
        .path
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("finding '{}' has not been tracked", finding.id))?;

    let resolution = match (resolution, like) {
        (Some(resolution), _) => resolution,
        (None, Some(video)) => ctx.engine().inspect(&video)?.resolution(),
        (None, None) => anyhow::bail!("pass --resolution WxH or --like <video>"),
    };

    let start = from_frame.unwrap_or(path.frame_range.start_frame);
    let end = to_frame.unwrap_or(path.frame_range.end_frame);
    if end < start {
        anyhow::bail!("--to-frame {end} precedes --from-frame {start}");
    }
    let frame_range = FrameRange::new(start, end);

    let written = rasterize_masks(path, frame_range, resolution, &output)?;
    let report = MasksReport {
        finding: finding.id.clone(),
        dir: output,
        frames: written.len(),
        frame_range,
        resolution,
    };

    ctx.emit(&report, |r| {
        println!(
            "Wrote {} {} mask frame(s) for '{}' to {}",
            r.frames,
            r.resolution,
            r.finding,
            r.dir.display()
        );
    })
}
