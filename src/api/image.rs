//! 图像智能裁剪

use crate::api::{collect_files, validate_file, BatchItem};
use crate::core::config::Config;
use crate::core::error::{Result, ThumbError};
use crate::core::image::registry::{build_features, build_filters};
use crate::core::image::{
    crop_specs, prepare_filters, rank_crops, select_candidate_crops, AspectRatio, CropExtractor,
    CropRect, Feature, ModelProviders,
};
use image::imageops::{self, FilterType};
use image::RgbImage;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Crops smaller than the image by at most this many pixels still go
/// through the search; anything larger yields no crops.
const SIZE_SLACK: u32 = 5;

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// 智能裁剪入口
///
/// ```ignore
/// let cropper = ImageCropper::new(Config::default())?
///     .with_models(ModelProviders::default().with_text(detector));
/// let crops = cropper.crop_image(Path::new("bird.jpg"), 300, 400, 3, &["text"])?;
/// ```
pub struct ImageCropper {
    config: Config,
    models: ModelProviders,
    features: Vec<Box<dyn Feature>>,
}

impl ImageCropper {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let models = ModelProviders::default();
        let features = build_features(&config, &models);
        info!("✂️ ImageCropper: created with {} features", features.len());
        Ok(Self {
            config,
            models,
            features,
        })
    }

    /// Attaches face/text model providers and rebuilds the feature list.
    pub fn with_models(mut self, models: ModelProviders) -> Self {
        self.features = build_features(&self.config, &models);
        self.models = models;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn load(path: &Path) -> Result<RgbImage> {
        validate_file(path)?;
        Ok(image::open(path)?.to_rgb8())
    }

    fn extractor(&self, down_sample_factor: Option<u32>) -> CropExtractor {
        let extractor = CropExtractor::new(&self.config);
        match down_sample_factor {
            Some(f) => extractor.with_down_sample_factor(f),
            None => extractor,
        }
    }

    /// Scored crops for one size, before filtering.
    fn candidates(
        &self,
        extractor: &CropExtractor,
        image: &RgbImage,
        crop_width: u32,
        crop_height: u32,
    ) -> Result<Vec<CropRect>> {
        let (w, h) = image.dimensions();
        if h + SIZE_SLACK <= crop_height || w + SIZE_SLACK <= crop_width {
            warn!(
                "⚠️ Crop {}x{} larger than image {}x{}",
                crop_width, crop_height, w, h
            );
            return Ok(Vec::new());
        }
        match extractor.extract_candidate_crops(image, crop_width, crop_height, &self.features) {
            Ok(crops) => Ok(crops),
            Err(e) if e.is_empty_candidate_set() => {
                debug!("🔍 {}", e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Top `k` crops of `crop_width` x `crop_height` for an in-memory image.
    pub fn crop_image_from_image(
        &self,
        image: &RgbImage,
        crop_width: u32,
        crop_height: u32,
        k: usize,
        filters: &[&str],
        down_sample_factor: Option<u32>,
    ) -> Result<Vec<CropRect>> {
        if crop_width == 0 || crop_height == 0 {
            return Err(ThumbError::InputValidation(format!(
                "crop size must be positive, got {}x{}",
                crop_width, crop_height
            )));
        }
        let extractor = self.extractor(down_sample_factor);
        let crops = self.candidates(&extractor, image, crop_width, crop_height)?;
        if crops.is_empty() {
            return Ok(crops);
        }
        let mut filters = build_filters(filters, &self.config, &self.models);
        let selected = select_candidate_crops(image, k, crops, &mut filters)?;
        info!(
            "✂️ {} crops of {}x{} selected",
            selected.len(),
            crop_width,
            crop_height
        );
        Ok(selected)
    }

    pub fn crop_image(
        &self,
        path: &Path,
        crop_width: u32,
        crop_height: u32,
        k: usize,
        filters: &[&str],
    ) -> Result<Vec<CropRect>> {
        let image = Self::load(path)?;
        self.crop_image_from_image(&image, crop_width, crop_height, k, filters, None)
    }

    /// Top `k` crops over every crop size matching `ratio` (e.g. `"4:3"`).
    pub fn crop_image_with_aspect_from_image(
        &self,
        image: &RgbImage,
        ratio: &str,
        k: usize,
        filters: &[&str],
        down_sample_factor: Option<u32>,
    ) -> Result<Vec<CropRect>> {
        let ratio: AspectRatio = ratio.parse()?;
        let (w, h) = image.dimensions();
        let specs = crop_specs(w, h, ratio, &self.config.image);
        debug!("🔍 {} crop sizes for ratio {}:{}", specs.len(), ratio.width, ratio.height);

        let extractor = self.extractor(down_sample_factor);
        let mut all = Vec::new();
        for (crop_w, crop_h) in specs {
            all.extend(self.candidates(&extractor, image, crop_w, crop_h)?);
        }
        if all.is_empty() {
            return Ok(all);
        }

        // 过滤器只对整张图准备一次，所有尺寸共用
        let mut filters = build_filters(filters, &self.config, &self.models);
        prepare_filters(image, &mut filters)?;
        let selected = rank_crops(k, all, &filters);
        info!(
            "✂️ {} crops selected for ratio {}:{}",
            selected.len(),
            ratio.width,
            ratio.height
        );
        Ok(selected)
    }

    pub fn crop_image_with_aspect(
        &self,
        path: &Path,
        ratio: &str,
        k: usize,
        filters: &[&str],
        down_sample_factor: Option<u32>,
    ) -> Result<Vec<CropRect>> {
        let image = Self::load(path)?;
        self.crop_image_with_aspect_from_image(&image, ratio, k, filters, down_sample_factor)
    }

    /// Crops every jpg/jpeg/png under `dir`. A failing file is reported in
    /// its own item and does not stop the others.
    pub fn crop_image_from_dir(
        &self,
        dir: &Path,
        crop_width: u32,
        crop_height: u32,
        k: usize,
        filters: &[&str],
    ) -> Result<Vec<BatchItem<Vec<CropRect>>>> {
        let files = collect_files(dir, &self.config.image.extensions)?;
        info!("📦 Cropping {} images in {}", files.len(), dir.display());
        Ok(files
            .into_iter()
            .map(|path: PathBuf| {
                let result = self.crop_image(&path, crop_width, crop_height, k, filters);
                if let Err(e) = &result {
                    warn!("⚠️ {}: {}", path.display(), e);
                }
                BatchItem::from_result(path, result)
            })
            .collect())
    }

    /// Best crop at the target aspect ratio, resized to exactly
    /// `target_width` x `target_height`. Falls back to resizing the whole
    /// image when no crop fits.
    pub fn resize_image_from_image(
        &self,
        image: &RgbImage,
        target_width: u32,
        target_height: u32,
        down_sample_factor: Option<u32>,
    ) -> Result<RgbImage> {
        if target_width == 0 || target_height == 0 {
            return Err(ThumbError::InputValidation(format!(
                "target size must be positive, got {}x{}",
                target_width, target_height
            )));
        }
        let g = gcd(target_width, target_height);
        let ratio = format!("{}:{}", target_width / g, target_height / g);
        let best = self
            .crop_image_with_aspect_from_image(image, &ratio, 1, &[], down_sample_factor)?
            .into_iter()
            .next();
        match best {
            Some(crop) => Ok(crop.with_target(target_width, target_height).crop_from(image)),
            None => {
                warn!("⚠️ No crop found for ratio {}, resizing whole image", ratio);
                Ok(imageops::resize(image, target_width, target_height, FilterType::Triangle))
            }
        }
    }

    pub fn resize_image(
        &self,
        path: &Path,
        target_width: u32,
        target_height: u32,
        down_sample_factor: Option<u32>,
    ) -> Result<RgbImage> {
        let image = Self::load(path)?;
        self.resize_image_from_image(&image, target_width, target_height, down_sample_factor)
    }

    /// Resizes every jpg/jpeg/png under `dir`; one item per file.
    pub fn resize_image_from_dir(
        &self,
        dir: &Path,
        target_width: u32,
        target_height: u32,
        down_sample_factor: Option<u32>,
    ) -> Result<Vec<BatchItem<RgbImage>>> {
        let files = collect_files(dir, &self.config.image.extensions)?;
        info!("📦 Resizing {} images in {}", files.len(), dir.display());
        Ok(files
            .into_iter()
            .map(|path| {
                let result = self.resize_image(&path, target_width, target_height, down_sample_factor);
                if let Err(e) = &result {
                    warn!("⚠️ {}: {}", path.display(), e);
                }
                BatchItem::from_result(path, result)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::detector::{Detection, MockDetector, ObjectDetector};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use image::Rgb;
    use std::sync::Arc;

    fn textured(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([((x * 7 + y * 3) % 256) as u8, ((x ^ y) % 256) as u8, ((x * y) % 251) as u8])
        })
    }

    fn cropper() -> ImageCropper {
        ImageCropper::new(Config::default()).unwrap()
    }

    #[test]
    fn test_oversized_crop_returns_empty() {
        let image = textured(1000, 1000);
        let crops = cropper()
            .crop_image_from_image(&image, 2000, 2000, 3, &[], None)
            .unwrap();
        assert!(crops.is_empty());
    }

    #[test]
    fn test_top_k_sorted_and_contained() {
        let image = textured(400, 300);
        let crops = cropper()
            .crop_image_from_image(&image, 160, 120, 5, &[], None)
            .unwrap();
        assert_eq!(crops.len(), 5);
        for c in &crops {
            assert!(c.fits_within(400, 300), "{}", c);
        }
        for pair in crops.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_text_filter_excludes_text_block() {
        let image = textured(400, 300);
        let text = Detection::new(180, 130, 220, 170, 0.99);
        let models = ModelProviders::default()
            .with_text(Arc::new(MockDetector::with_fixed_boxes(vec![text])));
        let cropper = cropper().with_models(models);

        let all = cropper
            .crop_image_from_image(&image, 160, 120, 1000, &[], None)
            .unwrap();
        let filtered = cropper
            .crop_image_from_image(&image, 160, 120, 1000, &["text"], None)
            .unwrap();

        assert!(!filtered.is_empty());
        assert!(filtered.len() < all.len());
        for c in &filtered {
            let disjoint = c.right() as i32 <= text.x0
                || c.x as i32 >= text.x1
                || c.bottom() as i32 <= text.y0
                || c.y as i32 >= text.y1;
            assert!(disjoint, "{}", c);
        }
    }

    #[test]
    fn test_unknown_filter_is_ignored() {
        let image = textured(400, 300);
        let crops = cropper()
            .crop_image_from_image(&image, 160, 120, 3, &["sparkle"], None)
            .unwrap();
        assert_eq!(crops.len(), 3);
    }

    #[test]
    fn test_aspect_ratio_crops() {
        let image = textured(1600, 1200);
        let crops = cropper()
            .crop_image_with_aspect_from_image(&image, "4:3", 3, &[], None)
            .unwrap();
        assert!(!crops.is_empty() && crops.len() <= 3);
        for c in &crops {
            let ratio = c.w as f64 / c.h as f64;
            assert!((ratio - 4.0 / 3.0).abs() < 0.01, "{}", c);
            assert!(c.fits_within(1600, 1200));
        }
    }

    #[test]
    fn test_bad_ratio_rejected() {
        let err = cropper()
            .crop_image_with_aspect_from_image(&textured(100, 100), "wide", 1, &[], None)
            .unwrap_err();
        assert!(matches!(err, ThumbError::InputValidation(_)));
    }

    #[test]
    fn test_resize_to_exact_target() {
        let image = textured(640, 480);
        let out = cropper().resize_image_from_image(&image, 300, 400, None).unwrap();
        assert_eq!(out.dimensions(), (300, 400));
    }

    #[test]
    fn test_crop_from_dir_reports_each_file() {
        let dir = tempfile::tempdir().unwrap();
        textured(400, 300).save(dir.path().join("good.png")).unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"not an image").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"skip me").unwrap();

        let items = cropper()
            .crop_image_from_dir(dir.path(), 160, 120, 2, &[])
            .unwrap();
        assert_eq!(items.len(), 2);
        let broken = &items[0];
        assert!(broken.path.ends_with("broken.jpg"));
        assert!(broken.data.is_none() && broken.error.is_some());
        let good = &items[1];
        assert!(good.path.ends_with("good.png"));
        assert_eq!(good.data.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_missing_file() {
        let err = cropper()
            .crop_image(Path::new("/no/such.jpg"), 10, 10, 1, &[])
            .unwrap_err();
        assert!(matches!(err, ThumbError::InputValidation(_)));
    }

    /// 记录调用次数的文字检测器
    struct CountingDetector {
        calls: AtomicUsize,
    }

    impl ObjectDetector for CountingDetector {
        fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Detection::new(700, 500, 900, 700, 0.99)])
        }
    }

    #[test]
    fn test_aspect_detects_text_once_per_image() {
        let detector = Arc::new(CountingDetector {
            calls: AtomicUsize::new(0),
        });
        let cropper = cropper().with_models(ModelProviders::default().with_text(detector.clone()));
        let crops = cropper
            .crop_image_with_aspect_from_image(&textured(1600, 1200), "4:3", 5, &["text"], None)
            .unwrap();
        assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
        assert!(crops.len() <= 5);
        for pair in crops.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_resize_with_down_sample_factor() {
        let image = textured(640, 480);
        let out = cropper()
            .resize_image_from_image(&image, 200, 200, Some(4))
            .unwrap();
        assert_eq!(out.dimensions(), (200, 200));
    }

    #[test]
    fn test_resize_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        textured(320, 240).save(dir.path().join("a.png")).unwrap();
        textured(240, 320).save(dir.path().join("b.jpg")).unwrap();
        std::fs::write(dir.path().join("c.png"), b"broken").unwrap();

        let items = cropper()
            .resize_image_from_dir(dir.path(), 100, 50, None)
            .unwrap();
        assert_eq!(items.len(), 3);
        for item in &items[..2] {
            assert_eq!(item.data.as_ref().map(|i| i.dimensions()), Some((100, 50)));
        }
        assert!(items[2].error.is_some());
    }
}
