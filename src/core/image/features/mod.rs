//! 特征图提供者：每个特征在工作图上输出一张同尺寸的单通道图

pub mod edge;
pub mod face;
pub mod saliency;

use crate::core::error::Result;
use image::{GrayImage, RgbImage};

pub use edge::EdgeFeature;
pub use face::FaceFeature;
pub use saliency::SaliencyFeature;

/// Scoring channel a feature map feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Saliency,
    Face,
    Edge,
}

pub trait Feature: Send + Sync {
    fn kind(&self) -> FeatureKind;

    /// Single-channel map with the same width and height as `image`.
    fn feature_map(&self, image: &RgbImage) -> Result<GrayImage>;

    fn weight(&self) -> f32;
}
