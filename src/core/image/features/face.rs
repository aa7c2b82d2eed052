use crate::core::config::FaceFeatureConfig;
use crate::core::detector::ObjectDetector;
use crate::core::error::Result;
use crate::core::image::features::{Feature, FeatureKind};
use image::{GrayImage, Luma, RgbImage};
use log::debug;
use std::sync::Arc;

/// 人脸区域填充值
const FACE_INTENSITY: u8 = 120;

pub struct FaceFeature {
    detector: Arc<dyn ObjectDetector>,
    confidence: f32,
    weight: f32,
}

impl FaceFeature {
    pub fn new(detector: Arc<dyn ObjectDetector>, config: &FaceFeatureConfig) -> Self {
        Self {
            detector,
            confidence: config.confidence,
            weight: config.weight,
        }
    }
}

impl Feature for FaceFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Face
    }

    fn feature_map(&self, image: &RgbImage) -> Result<GrayImage> {
        let (w, h) = image.dimensions();
        let mut map = GrayImage::new(w, h);
        if w == 0 || h == 0 {
            return Ok(map);
        }

        let faces = self.detector.detect(image)?;
        let mut kept = 0;
        for face in faces.iter().filter(|f| f.confidence >= self.confidence) {
            let x0 = face.x0.clamp(0, w as i32 - 1) as u32;
            let y0 = face.y0.clamp(0, h as i32 - 1) as u32;
            let x1 = face.x1.clamp(0, w as i32 - 1) as u32;
            let y1 = face.y1.clamp(0, h as i32 - 1) as u32;
            for y in y0..=y1 {
                for x in x0..=x1 {
                    map.put_pixel(x, y, Luma([FACE_INTENSITY]));
                }
            }
            kept += 1;
        }
        debug!("🙂 Face feature: {} of {} detections kept", kept, faces.len());
        Ok(map)
    }

    fn weight(&self) -> f32 {
        self.weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::detector::{Detection, MockDetector};

    #[test]
    fn test_faces_drawn_as_filled_boxes() {
        let detector = MockDetector::with_fixed_boxes(vec![
            Detection::new(2, 3, 5, 6, 0.9),
            Detection::new(10, 10, 12, 12, 0.2),
        ]);
        let feature = FaceFeature::new(Arc::new(detector), &FaceFeatureConfig::default());
        let map = feature.feature_map(&RgbImage::new(16, 16)).unwrap();

        assert_eq!(map.get_pixel(2, 3)[0], 120);
        assert_eq!(map.get_pixel(5, 6)[0], 120);
        assert_eq!(map.get_pixel(6, 6)[0], 0);
        // 低置信度被忽略
        assert_eq!(map.get_pixel(11, 11)[0], 0);
        assert_eq!(feature.kind(), FeatureKind::Face);
        assert_eq!(feature.weight(), 1.0);
    }

    #[test]
    fn test_boxes_clamped_to_image() {
        let detector = MockDetector::with_fixed_boxes(vec![Detection::new(-5, -5, 100, 3, 1.0)]);
        let feature = FaceFeature::new(Arc::new(detector), &FaceFeatureConfig::default());
        let map = feature.feature_map(&RgbImage::new(8, 8)).unwrap();
        assert_eq!(map.get_pixel(7, 0)[0], 120);
        assert_eq!(map.get_pixel(0, 4)[0], 0);
    }

    #[test]
    fn test_detector_failure_propagates() {
        let feature = FaceFeature::new(
            Arc::new(MockDetector::failing("no model")),
            &FaceFeatureConfig::default(),
        );
        assert!(feature.feature_map(&RgbImage::new(8, 8)).is_err());
    }
}
