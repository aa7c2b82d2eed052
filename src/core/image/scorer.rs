//! Candidate scoring.
//!
//! Each candidate gets a geometric importance map (edge-distance penalty,
//! radial falloff, optional rule-of-thirds) that is multiplied with the
//! stacked feature channels and summed. Pixels outside the candidate carry a
//! constant `outside_importance`, so the sum splits into an inside term plus
//! `outside * (channel_total - channel_inside)`.

use crate::core::config::CropScorerConfig;
use crate::core::error::{Result, ThumbError};
use crate::core::image::candidates::Candidate;
use crate::core::image::features::FeatureKind;
use image::GrayImage;
use rayon::prelude::*;

/// 工作图上的各特征通道，数值已归一化到 [0, 1]
#[derive(Debug, Clone)]
pub struct FeatureStack {
    width: u32,
    height: u32,
    saliency: Option<Vec<f64>>,
    face: Option<Vec<f64>>,
    detail: Option<Vec<f64>>,
    rects: Option<Vec<f64>>,
}

impl FeatureStack {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            saliency: None,
            face: None,
            detail: None,
            rects: None,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn insert(&mut self, kind: FeatureKind, map: &GrayImage) -> Result<()> {
        if map.dimensions() != (self.width, self.height) {
            return Err(ThumbError::InputValidation(format!(
                "{:?} feature map is {}x{}, working image is {}x{}",
                kind,
                map.width(),
                map.height(),
                self.width,
                self.height
            )));
        }
        let values: Vec<f64> = map.as_raw().iter().map(|&v| v as f64 / 255.0).collect();
        match kind {
            FeatureKind::Saliency => self.saliency = Some(values),
            FeatureKind::Face => self.face = Some(values),
            FeatureKind::Edge => self.detail = Some(values),
        }
        Ok(())
    }

    /// Optional bonus regions; absent means the channel scores zero.
    pub fn set_rects(&mut self, map: &GrayImage) -> Result<()> {
        if map.dimensions() != (self.width, self.height) {
            return Err(ThumbError::InputValidation(
                "rects map does not match working image".into(),
            ));
        }
        self.rects = Some(map.as_raw().iter().map(|&v| v as f64 / 255.0).collect());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CropScorer {
    config: CropScorerConfig,
}

impl Default for CropScorer {
    fn default() -> Self {
        Self::new(CropScorerConfig::default())
    }
}

impl CropScorer {
    pub fn new(config: CropScorerConfig) -> Self {
        Self { config }
    }

    fn thirds(x: f64) -> f64 {
        let x = (((x + 2.0 / 3.0).rem_euclid(2.0)) * 0.5 - 0.5) * 16.0;
        (1.0 - x * x).max(0.0)
    }

    /// Importance of a pixel at normalized center distance (px, py) ∈ [0, 2].
    fn pixel_importance(&self, px: f64, py: f64) -> f64 {
        let c = &self.config;
        let dx = (px - 1.0 + c.edge_radius).max(0.0);
        let dy = (py - 1.0 + c.edge_radius).max(0.0);
        let d = (dx * dx + dy * dy) * c.edge_weight;
        let mut s = 1.41 - (px * px + py * py).sqrt();
        if c.rule_of_thirds {
            s = ((s + d + 0.5).max(0.0) * 1.2) * (Self::thirds(px) + Self::thirds(py));
        }
        s + d
    }

    fn axis_distances(origin: u32, end: u32, size: f64) -> Vec<f64> {
        (origin..end)
            .map(|i| ((0.5 - (i - origin) as f64 / size).abs()) * 2.0)
            .collect()
    }

    /// Full importance map for one candidate, row-major over the working image.
    pub fn importance_map(&self, candidate: &Candidate, width: u32, height: u32) -> Vec<f64> {
        let mut map = vec![self.config.outside_importance; (width * height) as usize];
        let col_end = candidate.col_end().min(width);
        let row_end = candidate.row_end().min(height);
        let pxs = Self::axis_distances(candidate.x, col_end, candidate.w);
        let pys = Self::axis_distances(candidate.y, row_end, candidate.h);

        for (dy, py) in pys.iter().enumerate() {
            let row = (candidate.y as usize + dy) * width as usize;
            for (dx, px) in pxs.iter().enumerate() {
                map[row + candidate.x as usize + dx] = self.pixel_importance(*px, *py);
            }
        }
        map
    }

    /// Per-pixel weighted sum of all channels, before importance.
    fn combined_channels(&self, stack: &FeatureStack) -> Vec<f64> {
        let c = &self.config;
        let n = (stack.width * stack.height) as usize;
        let zero = |v: &Option<Vec<f64>>, i: usize| v.as_ref().map_or(0.0, |m| m[i]);

        (0..n)
            .map(|i| {
                let detail = zero(&stack.detail, i);
                let face = zero(&stack.face, i) * (detail + c.face_bias);
                let saliency = zero(&stack.saliency, i) * (detail + c.saliency_bias);
                let rects = zero(&stack.rects, i);
                detail * c.detail_weight
                    + face * c.face_weight
                    + saliency * c.saliency_weight
                    + rects * c.rects_weight
            })
            .collect()
    }

    fn score_with(&self, combined: &[f64], total: f64, width: u32, height: u32, candidate: &Candidate) -> f64 {
        let col_end = candidate.col_end().min(width);
        let row_end = candidate.row_end().min(height);
        let pxs = Self::axis_distances(candidate.x, col_end, candidate.w);
        let pys = Self::axis_distances(candidate.y, row_end, candidate.h);

        let mut inside_weighted = 0.0;
        let mut inside_raw = 0.0;
        for (dy, py) in pys.iter().enumerate() {
            let row = (candidate.y as usize + dy) * width as usize + candidate.x as usize;
            for (dx, px) in pxs.iter().enumerate() {
                let v = combined[row + dx];
                inside_weighted += v * self.pixel_importance(*px, *py);
                inside_raw += v;
            }
        }

        let outside = self.config.outside_importance * (total - inside_raw);
        (inside_weighted + outside) / (candidate.w * candidate.h)
    }

    pub fn score(&self, stack: &FeatureStack, candidate: &Candidate) -> f64 {
        let combined = self.combined_channels(stack);
        let total: f64 = combined.iter().sum();
        self.score_with(&combined, total, stack.width, stack.height, candidate)
    }

    /// Scores every candidate in parallel; output order follows the input.
    pub fn score_all(&self, stack: &FeatureStack, candidates: &[Candidate]) -> Vec<f64> {
        let combined = self.combined_channels(stack);
        let total: f64 = combined.iter().sum();
        candidates
            .par_iter()
            .map(|c| self.score_with(&combined, total, stack.width, stack.height, c))
            .collect()
    }
}
