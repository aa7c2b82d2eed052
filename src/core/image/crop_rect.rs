use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::Serialize;

/// 裁剪框，原图像素坐标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_height: Option<u32>,
}

impl CropRect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            score: 0.0,
            target_width: None,
            target_height: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_target(mut self, width: u32, height: u32) -> Self {
        self.target_width = Some(width);
        self.target_height = Some(height);
        self
    }

    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }

    /// Pixels of this rectangle taken from `source`, clipped to its bounds and
    /// resized to the target size when one is set.
    pub fn crop_from(&self, source: &RgbImage) -> RgbImage {
        let (sw, sh) = source.dimensions();
        let x = self.x.min(sw);
        let y = self.y.min(sh);
        let w = self.w.min(sw - x);
        let h = self.h.min(sh - y);
        let cropped = imageops::crop_imm(source, x, y, w, h).to_image();

        match (self.target_width, self.target_height) {
            (Some(tw), Some(th)) if w > 0 && h > 0 && tw > 0 && th > 0 && (tw, th) != (w, h) => {
                imageops::resize(&cropped, tw, th, FilterType::Triangle)
            }
            _ => cropped,
        }
    }
}

impl std::fmt::Display for CropRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "x: {} y: {} width: {} height: {} score: {:.4}",
            self.x, self.y, self.w, self.h, self.score
        )
    }
}
