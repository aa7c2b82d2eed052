use crate::core::error::Result;
use crate::core::image::features::{Feature, FeatureKind};
use crate::core::imaging::to_gray;
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use rustdct::{DctPlanner, TransformType2And3};
use std::sync::Arc;

/// 计算显著性时的最大边长
const SIGNATURE_SIZE: u32 = 64;

/// Image-signature saliency: sign of the 2-D DCT, inverted, squared and
/// Gaussian-smoothed.
pub struct SaliencyFeature {
    weight: f32,
}

impl SaliencyFeature {
    pub fn new(weight: f32) -> Self {
        Self { weight }
    }

    fn dct_rows(dct: &Arc<dyn TransformType2And3<f32>>, data: &mut [f32], width: usize, inverse: bool) {
        for row in data.chunks_exact_mut(width) {
            if inverse {
                dct.process_dct3(row);
            } else {
                dct.process_dct2(row);
            }
        }
    }

    fn transpose(data: &[f32], width: usize, height: usize) -> Vec<f32> {
        let mut out = vec![0f32; data.len()];
        for y in 0..height {
            for x in 0..width {
                out[x * height + y] = data[y * width + x];
            }
        }
        out
    }

    fn dct_2d(data: &[f32], width: usize, height: usize, inverse: bool) -> Vec<f32> {
        let mut planner = DctPlanner::new();
        let row_dct = planner.plan_dct2(width);
        let col_dct = planner.plan_dct2(height);

        let mut rows = data.to_vec();
        Self::dct_rows(&row_dct, &mut rows, width, inverse);
        let mut cols = Self::transpose(&rows, width, height);
        Self::dct_rows(&col_dct, &mut cols, height, inverse);
        Self::transpose(&cols, height, width)
    }

    pub fn saliency_map(&self, gray: &GrayImage) -> GrayImage {
        let (ow, oh) = gray.dimensions();
        if ow == 0 || oh == 0 {
            return GrayImage::new(ow, oh);
        }

        let scale = (SIGNATURE_SIZE as f32 / ow.max(oh) as f32).min(1.0);
        let w = ((ow as f32 * scale).round() as u32).max(1);
        let h = ((oh as f32 * scale).round() as u32).max(1);
        let small = if (w, h) == (ow, oh) {
            gray.clone()
        } else {
            imageops::resize(gray, w, h, FilterType::Triangle)
        };

        let (wu, hu) = (w as usize, h as usize);
        let pixels: Vec<f32> = small.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
        let coeffs = Self::dct_2d(&pixels, wu, hu, false);
        // 直流分量不参与；数值噪声级别的系数视为 0
        let cutoff = coeffs.iter().fold(0f32, |m, c| m.max(c.abs())) * 1e-4;
        let signature: Vec<f32> = coeffs
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                if i == 0 || c.abs() <= cutoff {
                    0.0
                } else {
                    c.signum()
                }
            })
            .collect();
        let energy: Vec<f32> = Self::dct_2d(&signature, wu, hu, true)
            .into_iter()
            .map(|v| v * v)
            .collect();

        // blur 会把浮点像素截断到 [0, 1]，先归一化
        let max = energy.iter().cloned().fold(0f32, f32::max);
        if max <= f32::EPSILON {
            return GrayImage::new(ow, oh);
        }
        let normalized: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_fn(w, h, |x, y| Luma([energy[(y * w + x) as usize] / max]));
        let sigma = (0.045 * w.max(h) as f32).max(0.5);
        let blurred = imageops::blur(&normalized, sigma);

        let peak = blurred.pixels().map(|p| p[0]).fold(0f32, f32::max);
        let floor = blurred.pixels().map(|p| p[0]).fold(f32::MAX, f32::min);
        let range = (peak - floor).max(f32::EPSILON);
        let map = GrayImage::from_fn(w, h, |x, y| {
            let v = (blurred.get_pixel(x, y)[0] - floor) / range;
            Luma([(v * 255.0).round().clamp(0.0, 255.0) as u8])
        });

        if (w, h) == (ow, oh) {
            map
        } else {
            imageops::resize(&map, ow, oh, FilterType::Triangle)
        }
    }
}

impl Default for SaliencyFeature {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Feature for SaliencyFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Saliency
    }

    fn feature_map(&self, image: &RgbImage) -> Result<GrayImage> {
        Ok(self.saliency_map(&to_gray(image)))
    }

    fn weight(&self) -> f32 {
        self.weight
    }
}
