//! Replacement-clip generation contract.
//!
//! A generator takes a source clip and a mask by reference, plus a text
//! prompt, and returns a reference to the generated replacement clip.

use std::path::{Path, PathBuf};

use cutline_common::error::{CutlineError, CutlineResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::BlobStore;

/// Tuning knobs forwarded to the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub inference_steps: u32,
    pub guidance_scale: f64,
    /// Output resolution label (`480p`, `580p`, `720p`).
    pub resolution: String,
    /// Ask for the input's frame count and frame rate in the output.
    pub match_input_frames: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            inference_steps: 30,
            guidance_scale: 5.0,
            resolution: "720p".to_string(),
            match_input_frames: true,
        }
    }
}

/// One replacement request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub video_url: String,
    pub mask_url: String,
    pub prompt: String,
    pub reference_image_url: Option<String>,
    #[serde(default)]
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(
        video_url: impl Into<String>,
        mask_url: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            video_url: video_url.into(),
            mask_url: mask_url.into(),
            prompt: prompt.into(),
            reference_image_url: None,
            params: GenerationParams::default(),
        }
    }

    pub fn validate(&self) -> CutlineResult<()> {
        if self.video_url.trim().is_empty() || self.mask_url.trim().is_empty() {
            return Err(CutlineError::invalid_input(
                "generation needs both a video and a mask reference",
            ));
        }
        if self.prompt.trim().is_empty() {
            return Err(CutlineError::invalid_input("generation prompt is empty"));
        }
        if self.params.inference_steps == 0 {
            return Err(CutlineError::invalid_input("inference_steps must be at least 1"));
        }
        Ok(())
    }

    /// Request body in the service's field naming.
    pub fn to_payload(&self) -> Value {
        let mut payload = serde_json::json!({
            "video_url": self.video_url,
            "mask_video_url": self.mask_url,
            "prompt": self.prompt,
            "num_inference_steps": self.params.inference_steps,
            "guidance_scale": self.params.guidance_scale,
            "resolution": self.params.resolution,
            "match_input_num_frames": self.params.match_input_frames,
            "match_input_frames_per_second": self.params.match_input_frames,
        });
        if let Some(reference) = &self.reference_image_url {
            payload["reference_image_urls"] = serde_json::json!([reference]);
        }
        payload
    }
}

/// Generated replacement clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedAsset {
    pub video_url: String,
    /// Raw service response, kept for diagnostics.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub response: Value,
}

impl GeneratedAsset {
    /// Build from a service response.
    pub fn from_response(response: Value) -> CutlineResult<Self> {
        let video_url = extract_video_url(&response)?;
        Ok(Self {
            video_url,
            response,
        })
    }

    /// Download the clip through `store` into `dest`.
    pub fn fetch(&self, store: &dyn BlobStore, dest: &Path) -> CutlineResult<PathBuf> {
        tracing::info!(url = %self.video_url, store = store.name(), "Fetching generated clip");
        store.download(&self.video_url, dest)
    }
}

/// Replacement-clip synthesis service.
pub trait ReplacementGenerator: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> CutlineResult<GeneratedAsset>;

    fn name(&self) -> &str;
}

/// Find the result URL in a generation response.
///
/// Accepts `{"video": {"url": ..}}`, `{"video_url": ..}` and
/// `{"output": {"video": ..}}`, in that order.
pub fn extract_video_url(response: &Value) -> CutlineResult<String> {
    let candidates = [
        response.pointer("/video/url"),
        response.get("video_url"),
        response.pointer("/output/video"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|url| !url.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| CutlineError::invalid_input("generation response has no video URL"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_params() {
        let params = GenerationParams::default();
        assert_eq!(params.inference_steps, 30);
        assert_eq!(params.guidance_scale, 5.0);
        assert_eq!(params.resolution, "720p");
        assert!(params.match_input_frames);
    }

    #[test]
    fn test_response_shapes() {
        let nested = json!({ "video": { "url": "https://cdn/a.mp4" } });
        let flat = json!({ "video_url": "https://cdn/b.mp4" });
        let output = json!({ "output": { "video": "https://cdn/c.mp4" } });
        assert_eq!(extract_video_url(&nested).unwrap(), "https://cdn/a.mp4");
        assert_eq!(extract_video_url(&flat).unwrap(), "https://cdn/b.mp4");
        assert_eq!(extract_video_url(&output).unwrap(), "https://cdn/c.mp4");
    }

    #[test]
    fn test_nested_shape_wins_and_blank_is_skipped() {
        let both = json!({
            "video": { "url": "" },
            "video_url": "https://cdn/flat.mp4",
        });
        assert_eq!(extract_video_url(&both).unwrap(), "https://cdn/flat.mp4");
        assert!(extract_video_url(&json!({ "status": "done" })).is_err());
    }

    #[test]
    fn test_payload_field_names() {
        let mut request = GenerationRequest::new("file:///v.mp4", "file:///m.mp4", "a red car");
        request.reference_image_url = Some("file:///ref.png".to_string());
        let payload = request.to_payload();
        assert_eq!(payload["mask_video_url"], "file:///m.mp4");
        assert_eq!(payload["num_inference_steps"], 30);
        assert_eq!(payload["match_input_frames_per_second"], true);
        assert_eq!(payload["reference_image_urls"][0], "file:///ref.png");
    }

    #[test]
    fn test_validation() {
        assert!(GenerationRequest::new("v", "m", "p").validate().is_ok());
        assert!(GenerationRequest::new("v", "m", "  ").validate().is_err());
        assert!(GenerationRequest::new("", "m", "p").validate().is_err());
    }

    struct Canned;

    impl ReplacementGenerator for Canned {
        fn generate(&self, request: &GenerationRequest) -> CutlineResult<GeneratedAsset> {
            request.validate()?;
            GeneratedAsset::from_response(json!({ "video_url": request.video_url }))
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn test_generated_asset_fetches_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::storage::LocalBlobStore::new(dir.path().join("blobs")).unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"generated").unwrap();
        let url = store.upload(&clip, "out/clip.mp4").unwrap();

        let generator: &dyn ReplacementGenerator = &Canned;
        let asset = generator
            .generate(&GenerationRequest::new(url, "file:///mask.mp4", "swap the logo"))
            .unwrap();
        let local = asset.fetch(&store, &dir.path().join("fetched.mp4")).unwrap();
        assert_eq!(std::fs::read(local).unwrap(), b"generated");
    }
}
