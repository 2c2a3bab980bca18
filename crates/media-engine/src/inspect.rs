//! Stream Inspector.

use std::path::Path;

use cutline_common::error::{CutlineError, CutlineResult};
use cutline_media_model::{FrameRate, MediaStreamInfo};
use serde_json::Value;

use crate::MediaEngine;

impl MediaEngine {
    /// Inspect a container's primary video stream.
    ///
    /// Fails with `UnreadableMedia` when there is no decodable video stream.
    pub fn inspect(&self, path: &Path) -> CutlineResult<MediaStreamInfo> {
        let doc = self.backend().probe_json(path)?;
        let info = parse_probe(&doc, path)?;
        tracing::debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            frame_rate = %info.frame_rate,
            total_frames = info.total_frames,
            has_audio = info.has_audio,
            "Inspected media"
        );
        Ok(info)
    }
}

/// Build stream info from an ffprobe JSON document.
pub fn parse_probe(doc: &Value, path: &Path) -> CutlineResult<MediaStreamInfo> {
    let streams = doc
        .get("streams")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let video = streams
        .iter()
        .find(|s| s.get("codec_type").and_then(Value::as_str) == Some("video"))
        .ok_or_else(|| CutlineError::unreadable(path, "no video stream"))?;
    let audio = streams
        .iter()
        .find(|s| s.get("codec_type").and_then(Value::as_str) == Some("audio"));

    let width = uint_field(video, "width")
        .ok_or_else(|| CutlineError::unreadable(path, "video stream has no width"))?
        as u32;
    let height = uint_field(video, "height")
        .ok_or_else(|| CutlineError::unreadable(path, "video stream has no height"))?
        as u32;
    if width == 0 || height == 0 {
        return Err(CutlineError::unreadable(
            path,
            format!("video stream has no area ({width}x{height})"),
        ));
    }

    let frame_rate = ["r_frame_rate", "avg_frame_rate"]
        .iter()
        .filter_map(|key| video.get(*key).and_then(Value::as_str))
        .find_map(|raw| raw.parse::<FrameRate>().ok())
        .ok_or_else(|| CutlineError::unreadable(path, "video stream has no frame rate"))?;

    let duration_secs = float_field(doc.get("format").unwrap_or(&Value::Null), "duration")
        .or_else(|| float_field(video, "duration"))
        .unwrap_or(0.0);

    let total_frames = uint_field(video, "nb_frames")
        .filter(|&n| n > 0)
        .unwrap_or_else(|| MediaStreamInfo::frames_from_duration(duration_secs, frame_rate));

    Ok(MediaStreamInfo {
        width,
        height,
        frame_rate,
        duration_secs,
        total_frames,
        video_codec: str_field(video, "codec_name").unwrap_or_else(|| "unknown".to_string()),
        pixel_format: str_field(video, "pix_fmt"),
        has_audio: audio.is_some(),
        audio_codec: audio.and_then(|a| str_field(a, "codec_name")),
        audio_sample_rate: audio.and_then(|a| uint_field(a, "sample_rate")).map(|v| v as u32),
        audio_channels: audio.and_then(|a| uint_field(a, "channels")).map(|v| v as u32),
    })
}

/// ffprobe reports some integers as strings.
fn uint_field(obj: &Value, key: &str) -> Option<u64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float_field(obj: &Value, key: &str) -> Option<f64> {
    let value = match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn str_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}
