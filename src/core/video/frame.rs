use crate::core::imaging::to_gray;
use image::{GrayImage, RgbImage};

/// 帧数据结构：解码后的画面及其与前一帧的差异
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub difference_score: f64,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(image: RgbImage, frame_number: u64) -> Self {
        Self {
            image,
            difference_score: 0.0,
            frame_number,
        }
    }

    pub fn with_difference(mut self, score: f64) -> Self {
        self.difference_score = score;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel_count(&self) -> usize {
        (self.width() * self.height()) as usize
    }

    pub fn to_gray(&self) -> GrayImage {
        to_gray(&self.image)
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_frame_creation() {
        let img = RgbImage::from_pixel(100, 50, Rgb([255, 255, 255]));
        let frame = Frame::new(img, 30).with_difference(12.5);

        assert_eq!(frame.width(), 100);
        assert_eq!(frame.height(), 50);
        assert_eq!(frame.pixel_count(), 5000);
        assert_eq!(frame.frame_number, 30);
        assert_eq!(frame.difference_score, 12.5);
        assert_eq!(frame.to_gray().get_pixel(0, 0)[0], 255);
    }
}
