//! 多样性选帧：质量过滤 → 直方图聚类 → 每簇取最清晰的一帧

use crate::core::config::ImageSelectorConfig;
use crate::core::video::Frame;
use crate::frame_extractor::kmeans::KMeans;
use crate::frame_extractor::quality::{brightness_score, entropy_score, laplacian_variance};
use image::GrayImage;
use log::{debug, info};
use rayon::prelude::*;
use rayon::ThreadPool;

/// Which branch the selector took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPath {
    /// Survivors were clustered and one representative kept per cluster.
    Clustered,
    /// Fewer survivors than requested; all of them are returned.
    PassThrough,
    /// Nothing survived the quality filter (or zero frames were requested).
    Empty,
}

#[derive(Debug)]
pub struct Selection {
    pub frames: Vec<Frame>,
    pub path: SelectionPath,
}

struct FrameQuality {
    brightness: f64,
    entropy: f64,
    sharpness: f64,
    histogram: Vec<f64>,
}

fn gray_histogram(gray: &GrayImage) -> Vec<f64> {
    let mut hist = vec![0.0; 256];
    for p in gray.pixels() {
        hist[p[0] as usize] += 1.0;
    }
    hist
}

pub struct ImageSelector {
    config: ImageSelectorConfig,
}

impl Default for ImageSelector {
    fn default() -> Self {
        Self::new(ImageSelectorConfig::default())
    }
}

impl ImageSelector {
    pub fn new(config: ImageSelectorConfig) -> Self {
        Self { config }
    }

    fn measure(&self, frame: &Frame) -> FrameQuality {
        let gray = frame.to_gray();
        FrameQuality {
            brightness: brightness_score(&frame.image),
            entropy: entropy_score(&gray, self.config.entropy_disk_radius),
            sharpness: laplacian_variance(&gray),
            histogram: gray_histogram(&gray),
        }
    }

    fn passes(&self, q: &FrameQuality) -> bool {
        let c = &self.config;
        q.brightness > c.min_brightness_value
            && q.brightness < c.max_brightness_value
            && q.entropy > c.min_entropy_value
            && q.entropy < c.max_entropy_value
    }

    /// Picks up to `n` diverse, well-exposed frames. Output keeps input order.
    pub fn select_best_frames(&self, pool: &ThreadPool, frames: Vec<Frame>, n: usize) -> Selection {
        if n == 0 || frames.is_empty() {
            return Selection {
                frames: Vec::new(),
                path: SelectionPath::Empty,
            };
        }

        let total = frames.len();
        let qualities: Vec<FrameQuality> =
            pool.install(|| frames.par_iter().map(|f| self.measure(f)).collect());

        let (survivors, metrics): (Vec<Frame>, Vec<FrameQuality>) = frames
            .into_iter()
            .zip(qualities)
            .filter(|(_, q)| self.passes(q))
            .unzip();
        debug!("🔍 Quality filter kept {}/{} frames", survivors.len(), total);

        if survivors.is_empty() {
            return Selection {
                frames: survivors,
                path: SelectionPath::Empty,
            };
        }
        if survivors.len() < n {
            info!("🎞️ Only {} frames passed, returning all", survivors.len());
            return Selection {
                frames: survivors,
                path: SelectionPath::PassThrough,
            };
        }

        let histograms: Vec<Vec<f64>> = metrics.iter().map(|q| q.histogram.clone()).collect();
        let clustering = KMeans::from_config(n, &self.config).fit(&histograms);

        let mut picked: Vec<usize> = clustering
            .members()
            .into_iter()
            .filter_map(|members| {
                // 第一个最大值胜出
                members.into_iter().fold(None, |best: Option<usize>, i| match best {
                    Some(b) if metrics[b].sharpness >= metrics[i].sharpness => Some(b),
                    _ => Some(i),
                })
            })
            .collect();
        picked.sort_unstable();

        let mut slots: Vec<Option<Frame>> = survivors.into_iter().map(Some).collect();
        let frames: Vec<Frame> = picked
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect();
        info!("🎞️ Selected {} key-frames from {} clusters", frames.len(), n);

        Selection {
            frames,
            path: SelectionPath::Clustered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rayon::ThreadPoolBuilder;

    fn pool() -> ThreadPool {
        ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    fn noisy_frame(base: [u8; 3], seed: u64) -> Frame {
        let mut rng = StdRng::seed_from_u64(seed);
        let img = RgbImage::from_fn(48, 48, |_, _| {
            let mut px = [0u8; 3];
            for (c, b) in px.iter_mut().zip(base) {
                *c = (b as i32 + rng.random_range(-20..=20)).clamp(0, 255) as u8;
            }
            Rgb(px)
        });
        Frame::new(img, seed)
    }

    fn mean_gray(frame: &Frame) -> f64 {
        let gray = frame.to_gray();
        gray.pixels().map(|p| p[0] as f64).sum::<f64>() / gray.len() as f64
    }

    #[test]
    fn test_zero_requested_is_empty() {
        let selector = ImageSelector::default();
        let result = selector.select_best_frames(&pool(), vec![noisy_frame([100, 100, 100], 1)], 0);
        assert_eq!(result.path, SelectionPath::Empty);
        assert!(result.frames.is_empty());
    }

    #[test]
    fn test_dark_and_flat_frames_filtered() {
        let frames = vec![
            Frame::new(RgbImage::from_pixel(32, 32, Rgb([0, 0, 0])), 0),
            Frame::new(RgbImage::from_pixel(32, 32, Rgb([120, 120, 120])), 1),
            Frame::new(RgbImage::from_pixel(32, 32, Rgb([255, 255, 255])), 2),
        ];
        let result = ImageSelector::default().select_best_frames(&pool(), frames, 2);
        assert_eq!(result.path, SelectionPath::Empty);
        assert!(result.frames.is_empty());
    }

    #[test]
    fn test_pass_through_when_few_survivors() {
        let frames = vec![
            noisy_frame([100, 100, 100], 1),
            Frame::new(RgbImage::from_pixel(32, 32, Rgb([0, 0, 0])), 2),
            noisy_frame([150, 150, 150], 3),
        ];
        let result = ImageSelector::default().select_best_frames(&pool(), frames, 5);
        assert_eq!(result.path, SelectionPath::PassThrough);
        let numbers: Vec<u64> = result.frames.iter().map(|f| f.frame_number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_result_capped_at_request() {
        let frames: Vec<Frame> = (0..12)
            .map(|i| noisy_frame([60 + (i * 10) as u8, 80, 90], i))
            .collect();
        let result = ImageSelector::default().select_best_frames(&pool(), frames, 4);
        assert_eq!(result.path, SelectionPath::Clustered);
        assert!(result.frames.len() <= 4);
        assert!(!result.frames.is_empty());
    }

    #[test]
    fn test_one_frame_per_distinct_segment() {
        let bases = [[40u8, 40, 120], [110, 110, 110], [180, 180, 150]];
        let frames: Vec<Frame> = bases
            .iter()
            .enumerate()
            .flat_map(|(s, base)| (0..10).map(move |i| noisy_frame(*base, (s * 100 + i) as u64)))
            .collect();

        let result = ImageSelector::default().select_best_frames(&pool(), frames, 3);
        assert_eq!(result.path, SelectionPath::Clustered);
        assert_eq!(result.frames.len(), 3);

        let means: Vec<f64> = result.frames.iter().map(mean_gray).collect();
        for (mean, expected) in means.iter().zip([49.0, 110.0, 176.0]) {
            assert!((mean - expected).abs() < 10.0, "{:?}", means);
        }
    }

    #[test]
    fn test_sharpest_member_represents_cluster() {
        let blurry = Frame::new(
            RgbImage::from_fn(32, 32, |x, _| Rgb([80 + (x % 2) as u8 * 4, 90, 100])),
            0,
        );
        let sharp = noisy_frame([88, 90, 100], 1);
        let selector = ImageSelector::new(ImageSelectorConfig {
            min_entropy_value: 0.5,
            ..ImageSelectorConfig::default()
        });
        let result = selector.select_best_frames(&pool(), vec![blurry, sharp], 1);
        assert_eq!(result.path, SelectionPath::Clustered);
        assert_eq!(result.frames.len(), 1);
        assert_eq!(result.frames[0].frame_number, 1);
    }

    #[test]
    fn test_solid_color_segments_have_no_entropy() {
        // 纯色帧局部熵为 0，低于下限 1，全部被过滤
        let bases = [[40u8, 40, 120], [110, 110, 110], [180, 180, 150]];
        let frames: Vec<Frame> = bases
            .iter()
            .enumerate()
            .flat_map(|(s, base)| {
                (0..10).map(move |i| Frame::new(RgbImage::from_pixel(48, 48, Rgb(*base)), (s * 10 + i) as u64))
            })
            .collect();
        let result = ImageSelector::default().select_best_frames(&pool(), frames, 3);
        assert_eq!(result.path, SelectionPath::Empty);
        assert!(result.frames.is_empty());
    }
}
