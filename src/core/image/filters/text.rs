use crate::core::config::{TextDetectorConfig, TextFilterMode};
use crate::core::detector::{Detection, ObjectDetector};
use crate::core::error::Result;
use crate::core::image::crop_rect::CropRect;
use crate::core::image::filters::CropFilter;
use image::RgbImage;
use log::debug;
use std::sync::Arc;

/// 文字过滤器：检测文字框，合并同一行的框，再按模式判定裁剪框
pub struct TextFilter {
    detector: Arc<dyn ObjectDetector>,
    min_confidence: f32,
    mode: TextFilterMode,
    text_rects: Vec<Detection>,
}

impl TextFilter {
    pub fn new(detector: Arc<dyn ObjectDetector>, config: &TextDetectorConfig) -> Self {
        Self {
            detector,
            min_confidence: config.min_confidence,
            mode: config.mode,
            text_rects: Vec::new(),
        }
    }

    pub fn text_rects(&self) -> &[Detection] {
        &self.text_rects
    }

    /// Groups boxes whose top edges lie within half the median box height of
    /// the previous box, and replaces each group by its bounding box.
    fn merge_boxes(mut rects: Vec<Detection>) -> Vec<Detection> {
        if rects.is_empty() {
            return rects;
        }
        let mut heights: Vec<i32> = rects.iter().map(|r| r.height()).collect();
        heights.sort_unstable();
        let interval = heights[heights.len() / 2] as f64 / 2.0;

        rects.sort_by_key(|r| r.x0);
        rects.sort_by_key(|r| r.y0);

        let mut groups: Vec<Vec<Detection>> = Vec::new();
        let mut prev: Option<Detection> = None;
        for rect in rects {
            match prev {
                Some(p) if ((rect.y0 - p.y0).abs() as f64) > interval => groups.push(vec![rect]),
                _ => match groups.last_mut() {
                    Some(group) => group.push(rect),
                    None => groups.push(vec![rect]),
                },
            }
            prev = Some(rect);
        }

        groups
            .into_iter()
            .map(|group| {
                let confidence = group.iter().map(|r| r.confidence).fold(0f32, f32::max);
                Detection::new(
                    group.iter().map(|r| r.x0).min().unwrap_or(0),
                    group.iter().map(|r| r.y0).min().unwrap_or(0),
                    group.iter().map(|r| r.x1).max().unwrap_or(0),
                    group.iter().map(|r| r.y1).max().unwrap_or(0),
                    confidence,
                )
            })
            .collect()
    }

    fn disjoint(rect: &Detection, crop: &CropRect) -> bool {
        let (cx0, cy0) = (crop.x as i64, crop.y as i64);
        let (cx1, cy1) = (crop.right() as i64, crop.bottom() as i64);
        rect.x1 as i64 <= cx0 || rect.x0 as i64 >= cx1 || rect.y1 as i64 <= cy0 || rect.y0 as i64 >= cy1
    }

    fn encloses(rect: &Detection, crop: &CropRect) -> bool {
        rect.x0 as i64 >= crop.x as i64
            && rect.y0 as i64 >= crop.y as i64
            && rect.x1 as i64 <= crop.right() as i64
            && rect.y1 as i64 <= crop.bottom() as i64
    }
}

impl CropFilter for TextFilter {
    fn name(&self) -> &'static str {
        "text"
    }

    fn set_image(&mut self, image: Option<&RgbImage>) -> Result<()> {
        let Some(image) = image else {
            return Ok(());
        };
        let detections: Vec<Detection> = self
            .detector
            .detect(image)?
            .into_iter()
            .filter(|d| d.confidence >= self.min_confidence)
            .collect();
        let found = detections.len();
        self.text_rects = Self::merge_boxes(detections);
        debug!(
            "🔤 Text filter: {} boxes merged into {} regions",
            found,
            self.text_rects.len()
        );
        Ok(())
    }

    fn filter_result(&self, crop: &CropRect) -> bool {
        match self.mode {
            TextFilterMode::Exclude => self.text_rects.iter().all(|r| Self::disjoint(r, crop)),
            TextFilterMode::Enclose => self.text_rects.iter().all(|r| Self::encloses(r, crop)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::detector::MockDetector;

    fn filter_with(boxes: Vec<Detection>, mode: TextFilterMode) -> TextFilter {
        let config = TextDetectorConfig {
            mode,
            ..TextDetectorConfig::default()
        };
        let mut filter = TextFilter::new(Arc::new(MockDetector::with_fixed_boxes(boxes)), &config);
        filter.set_image(Some(&RgbImage::new(400, 300))).unwrap();
        filter
    }

    #[test]
    fn test_merge_boxes_on_same_line() {
        let merged = TextFilter::merge_boxes(vec![
            Detection::new(100, 50, 140, 70, 0.95),
            Detection::new(10, 52, 60, 72, 0.95),
            Detection::new(10, 200, 60, 220, 0.95),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].x0, merged[0].y0, merged[0].x1, merged[0].y1), (10, 50, 140, 72));
        assert_eq!((merged[1].y0, merged[1].y1), (200, 220));
    }

    #[test]
    fn test_exclude_mode() {
        let filter = filter_with(vec![Detection::new(180, 130, 220, 170, 0.99)], TextFilterMode::Exclude);
        assert!(filter.filter_result(&CropRect::new(0, 0, 160, 120)));
        // 恰好贴边不算重叠
        assert!(filter.filter_result(&CropRect::new(0, 0, 180, 300)));
        assert!(!filter.filter_result(&CropRect::new(100, 100, 160, 120)));
    }

    #[test]
    fn test_enclose_mode() {
        let filter = filter_with(vec![Detection::new(180, 130, 220, 170, 0.99)], TextFilterMode::Enclose);
        assert!(filter.filter_result(&CropRect::new(100, 100, 160, 120)));
        assert!(!filter.filter_result(&CropRect::new(0, 0, 160, 120)));
    }

    #[test]
    fn test_low_confidence_and_missing_image() {
        let filter = filter_with(vec![Detection::new(0, 0, 400, 300, 0.5)], TextFilterMode::Exclude);
        assert!(filter.text_rects().is_empty());
        assert!(filter.filter_result(&CropRect::new(0, 0, 10, 10)));

        let mut untouched = TextFilter::new(
            Arc::new(MockDetector::failing("unreachable")),
            &TextDetectorConfig::default(),
        );
        untouched.set_image(None).unwrap();
        assert!(untouched.filter_result(&CropRect::new(0, 0, 10, 10)));
        assert_eq!(untouched.name(), "text");
    }
}
