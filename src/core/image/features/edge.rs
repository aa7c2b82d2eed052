use crate::core::config::EdgeFeatureConfig;
use crate::core::error::Result;
use crate::core::image::features::{Feature, FeatureKind};
use crate::core::imaging::to_gray;
use image::{GrayImage, RgbImage};
use imageproc::edges;

/// Canny 边缘图，阈值来自配置（默认 100/200）
pub struct EdgeFeature {
    low: f32,
    high: f32,
    weight: f32,
}

impl EdgeFeature {
    pub fn new(config: &EdgeFeatureConfig) -> Self {
        let (low, high) = if config.min_val_threshold <= config.max_val_threshold {
            (config.min_val_threshold, config.max_val_threshold)
        } else {
            (config.max_val_threshold, config.min_val_threshold)
        };
        Self {
            low: low as f32,
            high: high as f32,
            weight: config.weight,
        }
    }

    pub fn detect_edges(&self, gray: &GrayImage) -> GrayImage {
        if gray.width() < 3 || gray.height() < 3 {
            return GrayImage::new(gray.width(), gray.height());
        }
        edges::canny(gray, self.low, self.high)
    }
}

impl Default for EdgeFeature {
    fn default() -> Self {
        Self::new(&EdgeFeatureConfig::default())
    }
}

impl Feature for EdgeFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Edge
    }

    fn feature_map(&self, image: &RgbImage) -> Result<GrayImage> {
        Ok(self.detect_edges(&to_gray(image)))
    }

    fn weight(&self) -> f32 {
        self.weight
    }
}
