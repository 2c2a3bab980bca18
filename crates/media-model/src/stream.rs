//! Inspected media stream information.

use serde::{Deserialize, Serialize};

use crate::region::Resolution;
use crate::timing::FrameRate;

/// Properties of a media container's primary video stream.
///
/// Derived and read-only. Recomputed on every inspection and never cached
/// across calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaStreamInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub duration_secs: f64,
    pub total_frames: u64,
    pub video_codec: String,
    #[serde(default)]
    pub pixel_format: Option<String>,
    pub has_audio: bool,
    #[serde(default)]
    pub audio_codec: Option<String>,
    #[serde(default)]
    pub audio_sample_rate: Option<u32>,
    #[serde(default)]
    pub audio_channels: Option<u32>,
}

impl MediaStreamInfo {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Index of the final frame, or `None` for an empty stream.
    pub fn last_frame(&self) -> Option<u64> {
        self.total_frames.checked_sub(1)
    }

    /// Frame count derived from duration when the container reports none.
    pub fn frames_from_duration(duration_secs: f64, rate: FrameRate) -> u64 {
        rate.frame_at(duration_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MediaStreamInfo {
        MediaStreamInfo {
            width: 1920,
            height: 1080,
            frame_rate: FrameRate::new(30000, 1001).unwrap(),
            duration_secs: 10.01,
            total_frames: 300,
            video_codec: "h264".to_string(),
            pixel_format: Some("yuv420p".to_string()),
            has_audio: true,
            audio_codec: Some("aac".to_string()),
            audio_sample_rate: Some(48000),
            audio_channels: Some(2),
        }
    }

    #[test]
    fn test_frames_from_duration_floors() {
        let rate = FrameRate::new(30000, 1001).unwrap();
        assert_eq!(MediaStreamInfo::frames_from_duration(10.01, rate), 300);
        assert_eq!(MediaStreamInfo::frames_from_duration(10.0, rate), 299);
    }

    #[test]
    fn test_serialization_keeps_exact_rate() {
        let info = sample();
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains(r#""frame_rate":{"num":30000,"den":1001}"#));
        let back: MediaStreamInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_last_frame() {
        let mut info = sample();
        assert_eq!(info.last_frame(), Some(299));
        info.total_frames = 0;
        assert_eq!(info.last_frame(), None);
    }
}
