use crate::core::error::Result;
use crate::core::image::crop_rect::CropRect;
use crate::core::image::filters::CropFilter;
use image::RgbImage;
use log::debug;

/// 稳定降序排序，分数相同保持生成顺序
pub fn sort_by_score(crops: &mut [CropRect]) {
    crops.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Hands the source image to every filter. Done once per image.
pub fn prepare_filters(image: &RgbImage, filters: &mut [Box<dyn CropFilter>]) -> Result<()> {
    for filter in filters.iter_mut() {
        filter.set_image(Some(image))?;
    }
    Ok(())
}

/// Drops candidates any prepared filter rejects, then returns the top `k`
/// by score.
pub fn rank_crops(k: usize, mut crops: Vec<CropRect>, filters: &[Box<dyn CropFilter>]) -> Vec<CropRect> {
    for filter in filters {
        let before = crops.len();
        crops.retain(|c| filter.filter_result(c));
        debug!(
            "🧹 Filter '{}' kept {} of {} crops",
            filter.name(),
            crops.len(),
            before
        );
    }

    sort_by_score(&mut crops);
    crops.truncate(k);
    crops
}

/// Runs every filter over the candidates, then returns the top `k` by score.
/// Each filter sees the source image once before testing candidates.
pub fn select_candidate_crops(
    image: &RgbImage,
    k: usize,
    crops: Vec<CropRect>,
    filters: &mut [Box<dyn CropFilter>],
) -> Result<Vec<CropRect>> {
    prepare_filters(image, filters)?;
    Ok(rank_crops(k, crops, filters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TextDetectorConfig;
    use crate::core::detector::{Detection, MockDetector};
    use crate::core::image::filters::TextFilter;
    use std::sync::Arc;

    fn crops() -> Vec<CropRect> {
        vec![
            CropRect::new(0, 0, 10, 10).with_score(0.1),
            CropRect::new(10, 0, 10, 10).with_score(0.7),
            CropRect::new(20, 0, 10, 10).with_score(0.7),
            CropRect::new(30, 0, 10, 10).with_score(-0.2),
            CropRect::new(40, 0, 10, 10).with_score(0.9),
        ]
    }

    #[test]
    fn test_sorted_descending_with_stable_ties() {
        let img = RgbImage::new(50, 10);
        let out = select_candidate_crops(&img, 10, crops(), &mut []).unwrap();
        assert_eq!(out.len(), 5);
        for pair in out.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // 同分时先生成的在前
        assert_eq!(out[1].x, 10);
        assert_eq!(out[2].x, 20);
    }

    #[test]
    fn test_top_k_bound() {
        let img = RgbImage::new(50, 10);
        assert_eq!(select_candidate_crops(&img, 2, crops(), &mut []).unwrap().len(), 2);
        assert!(select_candidate_crops(&img, 0, crops(), &mut []).unwrap().is_empty());
    }

    #[test]
    fn test_filters_run_before_ranking() {
        let img = RgbImage::new(50, 10);
        let detector = MockDetector::with_fixed_boxes(vec![Detection::new(42, 2, 46, 6, 0.99)]);
        let mut filters: Vec<Box<dyn CropFilter>> = vec![Box::new(TextFilter::new(
            Arc::new(detector),
            &TextDetectorConfig::default(),
        ))];
        let out = select_candidate_crops(&img, 3, crops(), &mut filters).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|c| c.x != 40));
        assert_eq!(out[0].score, 0.7);
    }
}
