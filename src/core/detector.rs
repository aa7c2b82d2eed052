use crate::core::error::{Result, ThumbError};
use image::RgbImage;
use serde::Serialize;

/// 检测框，像素坐标（可能越出图像边界，使用方自行裁剪）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
    pub confidence: f32,
}

impl Detection {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32, confidence: f32) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            confidence,
        }
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }
}

/// Pretrained face/text model behind a plain contract. How the model is
/// fetched or run is the implementor's business.
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>>;
}

type DetectFn = Box<dyn Fn(&RgbImage) -> Result<Vec<Detection>> + Send + Sync>;

pub struct MockDetector {
    pattern: Option<DetectFn>,
}

impl MockDetector {
    pub fn new() -> Self {
        Self { pattern: None }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(&RgbImage) -> Vec<Detection> + Send + Sync + 'static,
    {
        Self {
            pattern: Some(Box::new(move |img| Ok(pattern(img)))),
        }
    }

    pub fn with_fixed_boxes(boxes: Vec<Detection>) -> Self {
        Self::with_pattern(move |_| boxes.clone())
    }

    /// Detector whose every call fails, for exercising error paths.
    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self {
            pattern: Some(Box::new(move |_| {
                Err(ThumbError::external("mock-detector", message.clone()))
            })),
        }
    }
}

impl Default for MockDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectDetector for MockDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        match &self.pattern {
            Some(p) => p(image),
            None => Ok(Vec::new()),
        }
    }
}
