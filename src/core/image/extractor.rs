use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::image::candidates::CandidateGenerator;
use crate::core::image::crop_rect::CropRect;
use crate::core::image::features::Feature;
use crate::core::image::scorer::{CropScorer, FeatureStack};
use crate::core::imaging::downsample;
use image::RgbImage;
use log::debug;
use std::time::Instant;

/// 降采样 → 特征图 → 候选框 → 打分 → 还原到原图坐标
pub struct CropExtractor {
    generator: CandidateGenerator,
    scorer: CropScorer,
    down_sample_factor: u32,
}

impl CropExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            generator: CandidateGenerator::from_config(&config.image),
            scorer: CropScorer::new(config.crop_scorer.clone()),
            down_sample_factor: config.image.down_sample_factor.max(1),
        }
    }

    pub fn with_down_sample_factor(mut self, factor: u32) -> Self {
        self.down_sample_factor = factor.max(1);
        self
    }

    pub fn down_sample_factor(&self) -> u32 {
        self.down_sample_factor
    }

    /// All candidate crops of `crop_width` x `crop_height` (source pixels),
    /// scored and in generation order.
    pub fn extract_candidate_crops(
        &self,
        image: &RgbImage,
        crop_width: u32,
        crop_height: u32,
        features: &[Box<dyn Feature>],
    ) -> Result<Vec<CropRect>> {
        let start = Instant::now();
        let factor = self.down_sample_factor;
        let working = downsample(image, factor);
        let (w, h) = working.dimensions();

        let mut stack = FeatureStack::new(w, h);
        for feature in features {
            let map = feature.feature_map(&working)?;
            stack.insert(feature.kind(), &map)?;
        }

        let candidates = self.generator.generate(
            w,
            h,
            crop_width as f64 / factor as f64,
            crop_height as f64 / factor as f64,
        )?;
        let scores = self.scorer.score_all(&stack, &candidates);

        debug!(
            "✂️ Scored {} candidates on {}x{} working image in {:?}",
            candidates.len(),
            w,
            h,
            start.elapsed()
        );

        Ok(candidates
            .iter()
            .zip(scores)
            .map(|(c, score)| c.rescale(factor, score))
            .collect())
    }
}
