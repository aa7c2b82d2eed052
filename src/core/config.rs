//! Pipeline configuration.
//!
//! A `Config` is built once per pipeline run (defaults, or a JSON5 file)
//! and handed to component constructors. Nothing mutates it afterwards.

use crate::core::error::{Result, ThumbError};
use crate::frame_extractor::smoothing::WindowKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub image: ImageConfig,
    pub crop_scorer: CropScorerConfig,
    pub edge_feature: EdgeFeatureConfig,
    pub face_feature: FaceFeatureConfig,
    pub text_detector: TextDetectorConfig,
    pub frame_extractor: FrameExtractorConfig,
    pub image_selector: ImageSelectorConfig,
    pub video: VideoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Factor by which the source is shrunk before feature extraction.
    pub down_sample_factor: u32,
    /// Aspect-ratio crops stop shrinking below 1/N of the image side.
    pub min_image_to_crop_factor: u32,
    /// Added to the height divisor on every aspect-ratio iteration.
    pub crop_height_reduction_factor: f64,
    pub max_scale: f64,
    pub min_scale: f64,
    pub scale_step: f64,
    /// Sliding window stride in working-image pixels.
    pub step: u32,
    pub extensions: Vec<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            down_sample_factor: 8,
            min_image_to_crop_factor: 4,
            crop_height_reduction_factor: 0.05,
            max_scale: 1.0,
            min_scale: 0.9,
            scale_step: 0.1,
            step: 8,
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CropScorerConfig {
    pub detail_weight: f64,
    pub edge_radius: f64,
    pub edge_weight: f64,
    /// Importance assigned to every pixel outside the candidate.
    pub outside_importance: f64,
    pub rule_of_thirds: bool,
    pub saliency_bias: f64,
    pub saliency_weight: f64,
    pub face_bias: f64,
    pub face_weight: f64,
    pub rects_weight: f64,
}

impl Default for CropScorerConfig {
    fn default() -> Self {
        Self {
            detail_weight: 0.2,
            edge_radius: 0.4,
            edge_weight: -20.0,
            outside_importance: -0.5,
            rule_of_thirds: true,
            saliency_bias: 0.2,
            saliency_weight: 1.3,
            face_bias: 0.01,
            face_weight: 3.4,
            rects_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeFeatureConfig {
    pub min_val_threshold: u32,
    pub max_val_threshold: u32,
    pub weight: f32,
}

impl Default for EdgeFeatureConfig {
    fn default() -> Self {
        Self {
            min_val_threshold: 100,
            max_val_threshold: 200,
            weight: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceFeatureConfig {
    pub confidence: f32,
    pub weight: f32,
}

impl Default for FaceFeatureConfig {
    fn default() -> Self {
        Self {
            confidence: 0.5,
            weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFilterMode {
    /// Keep crops that do not touch any text box.
    Exclude,
    /// Keep crops that fully contain every text box.
    Enclose,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDetectorConfig {
    pub min_confidence: f32,
    pub mode: TextFilterMode,
}

impl Default for TextDetectorConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.9,
            mode: TextFilterMode::Exclude,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameExtractorConfig {
    pub len_window: usize,
    pub max_frames_in_chunk: usize,
    pub window_type: WindowKind,
}

impl Default for FrameExtractorConfig {
    fn default() -> Self {
        Self {
            len_window: 20,
            max_frames_in_chunk: 2500,
            window_type: WindowKind::Hanning,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSelectorConfig {
    pub min_brightness_value: f64,
    pub max_brightness_value: f64,
    pub min_entropy_value: f64,
    pub max_entropy_value: f64,
    pub entropy_disk_radius: u32,
    pub kmeans_seed: u64,
    pub kmeans_restarts: usize,
    pub kmeans_max_iter: usize,
}

impl Default for ImageSelectorConfig {
    fn default() -> Self {
        Self {
            min_brightness_value: 10.0,
            max_brightness_value: 90.0,
            min_entropy_value: 1.0,
            max_entropy_value: 10.0,
            entropy_disk_radius: 5,
            kmeans_seed: 0,
            kmeans_restarts: 10,
            kmeans_max_iter: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// A trailing sub-clip shorter than this is merged into the previous one.
    pub min_video_duration: f64,
    pub extensions: Vec<String>,
    pub ffmpeg_binary: String,
    pub ffprobe_binary: String,
    /// Where sub-clips are written; system temp dir when unset.
    pub temp_dir: Option<PathBuf>,
    /// Worker count; half the cores when unset.
    pub workers: Option<usize>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            min_video_duration: 5.0,
            extensions: vec![
                "mp4".into(),
                "mov".into(),
                "avi".into(),
                "mkv".into(),
                "webm".into(),
                "m4v".into(),
            ],
            ffmpeg_binary: "ffmpeg".into(),
            ffprobe_binary: "ffprobe".into(),
            temp_dir: None,
            workers: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ThumbError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json5_str(&content)
    }

    pub fn from_json5_str(content: &str) -> Result<Self> {
        let config: Config = json5::from_str(content)
            .map_err(|e| ThumbError::Configuration(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let image = &self.image;
        if image.down_sample_factor == 0 {
            return Err(ThumbError::Configuration(
                "image.down_sample_factor must be >= 1".into(),
            ));
        }
        if image.step == 0 {
            return Err(ThumbError::Configuration("image.step must be >= 1".into()));
        }
        if image.min_image_to_crop_factor == 0 {
            return Err(ThumbError::Configuration(
                "image.min_image_to_crop_factor must be >= 1".into(),
            ));
        }
        if image.crop_height_reduction_factor <= 0.0 {
            return Err(ThumbError::Configuration(
                "image.crop_height_reduction_factor must be positive".into(),
            ));
        }
        if image.scale_step <= 0.0 || image.min_scale <= 0.0 || image.min_scale > image.max_scale {
            return Err(ThumbError::Configuration(format!(
                "invalid scale range [{}, {}] step {}",
                image.min_scale, image.max_scale, image.scale_step
            )));
        }
        if self.frame_extractor.max_frames_in_chunk < 2 {
            return Err(ThumbError::Configuration(
                "frame_extractor.max_frames_in_chunk must be >= 2".into(),
            ));
        }
        let sel = &self.image_selector;
        if sel.min_brightness_value >= sel.max_brightness_value
            || sel.min_entropy_value >= sel.max_entropy_value
        {
            return Err(ThumbError::Configuration(
                "image_selector ranges must satisfy min < max".into(),
            ));
        }
        if sel.kmeans_restarts == 0 {
            return Err(ThumbError::Configuration(
                "image_selector.kmeans_restarts must be >= 1".into(),
            ));
        }
        if self.video.workers == Some(0) {
            return Err(ThumbError::Configuration("video.workers must be >= 1".into()));
        }
        Ok(())
    }
}
