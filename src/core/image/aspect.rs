use crate::core::config::ImageConfig;
use crate::core::error::{Result, ThumbError};
use regex::Regex;
use std::str::FromStr;

/// 宽高比，例如 "4:3"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ThumbError::InputValidation(format!(
                "aspect ratio terms must be positive, got {}:{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn value(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl FromStr for AspectRatio {
    type Err = ThumbError;

    fn from_str(s: &str) -> Result<Self> {
        let regex = Regex::new(r"^\s*(\d+)\s*:\s*(\d+)\s*$")
            .map_err(|e| ThumbError::Configuration(e.to_string()))?;
        let caps = regex
            .captures(s)
            .ok_or_else(|| ThumbError::InputValidation(format!("invalid aspect ratio '{}'", s)))?;
        let parse = |i: usize| -> Result<u32> {
            caps[i]
                .parse::<u32>()
                .map_err(|e| ThumbError::InputValidation(format!("invalid aspect ratio '{}': {}", s, e)))
        };
        Self::new(parse(1)?, parse(2)?)
    }
}

/// Crop sizes `(width, height)` for `ratio`, starting from the largest crop
/// that fits and shrinking the height by cumulative divisors 1, 1.05, 1.10…
/// until either side drops below 1/`min_image_to_crop_factor` of the image.
/// Consecutive duplicates are dropped.
pub fn crop_specs(
    image_width: u32,
    image_height: u32,
    ratio: AspectRatio,
    config: &ImageConfig,
) -> Vec<(u32, u32)> {
    let (rw, rh) = (ratio.width as f64, ratio.height as f64);
    let factor = config.min_image_to_crop_factor.max(1);
    let min_h = (image_height / factor) as f64;
    let min_w = (image_width / factor) as f64;
    let reduction = config.crop_height_reduction_factor.max(f64::EPSILON);

    let mut specs: Vec<(u32, u32)> = Vec::new();
    let mut crop_h = (image_height as f64).min(image_width as f64 * rh / rw);
    let mut divisor = 1.0;
    loop {
        let h = crop_h.floor();
        let w = (h * rw / rh).floor();
        if h < 1.0 || w < 1.0 || h < min_h || w < min_w {
            break;
        }
        let spec = (w as u32, h as u32);
        if specs.last() != Some(&spec) {
            specs.push(spec);
        }
        crop_h = h / divisor;
        divisor += reduction;
    }
    specs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ratio() {
        assert_eq!("4:3".parse::<AspectRatio>().unwrap(), AspectRatio { width: 4, height: 3 });
        assert_eq!(" 16 : 9 ".parse::<AspectRatio>().unwrap().width, 16);
        for bad in ["4x3", "4:", ":3", "0:3", "a:b", "4:3:2", ""] {
            let err = bad.parse::<AspectRatio>().unwrap_err();
            assert!(matches!(err, ThumbError::InputValidation(_)), "{}", bad);
        }
    }

    #[test]
    fn test_specs_height_limited() {
        let ratio: AspectRatio = "4:3".parse().unwrap();
        let specs = crop_specs(1600, 1200, ratio, &ImageConfig::default());
        assert_eq!(specs[0], (1600, 1200));
        assert_eq!(specs[1], (1522, 1142));
        for (w, h) in &specs {
            assert!(*w <= 1600 && *h <= 1200);
            assert!(*h >= 300 && *w >= 400);
            assert!((*w as f64 / *h as f64 - 4.0 / 3.0).abs() < 0.01);
        }
        for pair in specs.windows(2) {
            assert!(pair[1].1 < pair[0].1);
        }
    }

    #[test]
    fn test_specs_width_limited() {
        let ratio: AspectRatio = "16:9".parse().unwrap();
        let specs = crop_specs(1000, 1000, ratio, &ImageConfig::default());
        assert_eq!(specs[0], (999, 562));
        assert!(specs.iter().all(|(w, _)| *w <= 1000));
    }

    #[test]
    fn test_specs_tiny_image() {
        let ratio: AspectRatio = "1:1".parse().unwrap();
        let specs = crop_specs(3, 3, ratio, &ImageConfig::default());
        assert!(specs.iter().all(|(w, h)| *w >= 1 && *h >= 1));
        assert!(!specs.is_empty());
    }
}
