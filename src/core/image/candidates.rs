use crate::core::config::ImageConfig;
use crate::core::error::{Result, ThumbError};
use crate::core::image::crop_rect::CropRect;

/// 工作图（降采样后）坐标系里的候选框；宽高保留小数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x: u32,
    pub y: u32,
    pub w: f64,
    pub h: f64,
}

impl Candidate {
    /// Exclusive end column of the pixels this candidate covers.
    pub fn col_end(&self) -> u32 {
        (self.x as f64 + self.w) as u32
    }

    pub fn row_end(&self) -> u32 {
        (self.y as f64 + self.h) as u32
    }

    /// Back to source coordinates, flooring the scaled size.
    pub fn rescale(&self, factor: u32, score: f64) -> CropRect {
        let f = factor.max(1);
        CropRect::new(
            self.x * f,
            self.y * f,
            (self.w * f as f64) as u32,
            (self.h * f as f64) as u32,
        )
        .with_score(score)
    }
}

#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    pub max_scale: f64,
    pub min_scale: f64,
    pub scale_step: f64,
    pub step: u32,
}

impl Default for CandidateGenerator {
    fn default() -> Self {
        Self::from_config(&ImageConfig::default())
    }
}

impl CandidateGenerator {
    pub fn from_config(config: &ImageConfig) -> Self {
        Self {
            max_scale: config.max_scale,
            min_scale: config.min_scale,
            scale_step: config.scale_step,
            step: config.step,
        }
    }

    /// Descending scales in whole percent, so 1.0 → 0.9 never drifts.
    pub fn scales(&self) -> Vec<f64> {
        let start = (self.max_scale * 100.0).round() as i64;
        let stop = ((self.min_scale - self.scale_step) * 100.0).round() as i64;
        let step = ((self.scale_step * 100.0).round() as i64).max(1);

        let mut scales = Vec::new();
        let mut pct = start;
        while pct > stop {
            scales.push(pct as f64 / 100.0);
            pct -= step;
        }
        scales
    }

    /// Every window of the scaled crop size that fits inside the image, in
    /// scale-descending, row-ascending, column-ascending order.
    pub fn generate(
        &self,
        image_width: u32,
        image_height: u32,
        crop_width: f64,
        crop_height: f64,
    ) -> Result<Vec<Candidate>> {
        if !(crop_width > 0.0 && crop_height > 0.0) {
            return Err(ThumbError::InputValidation(format!(
                "crop size must be positive, got {}x{}",
                crop_width, crop_height
            )));
        }

        let step = self.step.max(1) as usize;
        let (iw, ih) = (image_width as f64, image_height as f64);
        let mut candidates = Vec::new();

        for scale in self.scales() {
            let (w, h) = (crop_width * scale, crop_height * scale);
            for y in (0..image_height).step_by(step) {
                if y as f64 + h > ih {
                    break;
                }
                for x in (0..image_width).step_by(step) {
                    if x as f64 + w > iw {
                        break;
                    }
                    candidates.push(Candidate { x, y, w, h });
                }
            }
        }

        if candidates.is_empty() {
            return Err(ThumbError::EmptyCandidateSet {
                crop_width,
                crop_height,
                image_width,
                image_height,
            });
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scales() {
        let gen = CandidateGenerator::default();
        assert_eq!(gen.scales(), vec![1.0, 0.9]);

        let wide = CandidateGenerator {
            max_scale: 1.0,
            min_scale: 0.5,
            scale_step: 0.25,
            step: 4,
        };
        assert_eq!(wide.scales(), vec![1.0, 0.75, 0.5]);
    }

    #[test]
    fn test_candidates_stay_inside_image() {
        let gen = CandidateGenerator::default();
        let (iw, ih) = (125u32, 93u32);
        let candidates = gen.generate(iw, ih, 60.5, 40.25).unwrap();
        assert!(!candidates.is_empty());
        for c in &candidates {
            assert!(c.x as f64 + c.w <= iw as f64);
            assert!(c.y as f64 + c.h <= ih as f64);
            assert!(c.col_end() <= iw && c.row_end() <= ih);
            assert_eq!(c.x % 8, 0);
            assert_eq!(c.y % 8, 0);
        }
    }

    #[test]
    fn test_generation_order() {
        let gen = CandidateGenerator::default();
        let candidates = gen.generate(40, 40, 20.0, 20.0).unwrap();
        // scale 1.0: x,y ∈ {0,8,16} → 9；scale 0.9 (18px): x,y ∈ {0,8,16} → 9
        assert_eq!(candidates.len(), 18);
        assert_eq!(candidates[0], Candidate { x: 0, y: 0, w: 20.0, h: 20.0 });
        assert_eq!((candidates[1].x, candidates[1].y), (8, 0));
        assert_eq!((candidates[3].x, candidates[3].y), (0, 8));
        assert!((candidates[9].w - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_oversized_crop_is_empty_candidate_set() {
        let gen = CandidateGenerator::default();
        let err = gen.generate(125, 125, 250.0, 250.0).unwrap_err();
        assert!(err.is_empty_candidate_set());

        let err = gen.generate(10, 10, 0.0, 5.0).unwrap_err();
        assert!(matches!(err, ThumbError::InputValidation(_)));
    }

    #[test]
    fn test_rescale_floors_size() {
        let c = Candidate {
            x: 8,
            y: 16,
            w: 171.225,
            h: 128.475,
        };
        let rect = c.rescale(8, 1.5);
        assert_eq!((rect.x, rect.y, rect.w, rect.h), (64, 128, 1369, 1027));
        assert_eq!(rect.score, 1.5);
    }
}
