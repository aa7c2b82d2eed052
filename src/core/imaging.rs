//! 像素级工具：灰度、CIE L*u*v*、按倍数缩放

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use once_cell::sync::Lazy;

// D65 white point chromaticity
const UN: f32 = 0.197_939_43;
const VN: f32 = 0.468_310_96;

static SRGB_TO_LINEAR: Lazy<[f32; 256]> = Lazy::new(|| {
    let mut table = [0f32; 256];
    for (i, v) in table.iter_mut().enumerate() {
        let c = i as f32 / 255.0;
        *v = if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        };
    }
    table
});

/// 灰度转换（整数运算，BT.601 权重）
#[inline]
pub fn gray_value(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

pub fn to_gray(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);
    for (src, dst) in image.pixels().zip(gray.pixels_mut()) {
        *dst = Luma([gray_value(src[0], src[1], src[2])]);
    }
    gray
}

/// One pixel to 8-bit L*u*v*, scaled the way 8-bit image libraries store it:
/// L·255/100, (u+134)·255/354, (v+140)·255/262.
pub fn rgb_to_luv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let lut = &*SRGB_TO_LINEAR;
    let (r, g, b) = (lut[r as usize], lut[g as usize], lut[b as usize]);

    let x = 0.412_453 * r + 0.357_580 * g + 0.180_423 * b;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = 0.019_334 * r + 0.119_193 * g + 0.950_227 * b;

    let l = if y > 0.008_856 {
        116.0 * y.cbrt() - 16.0
    } else {
        903.3 * y
    };

    let d = x + 15.0 * y + 3.0 * z;
    let (u, v) = if d > f32::EPSILON {
        (13.0 * l * (4.0 * x / d - UN), 13.0 * l * (9.0 * y / d - VN))
    } else {
        (0.0, 0.0)
    };

    [
        to_u8(l * 255.0 / 100.0),
        to_u8((u + 134.0) * 255.0 / 354.0),
        to_u8((v + 140.0) * 255.0 / 262.0),
    ]
}

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// 整帧转换为 L*u*v*，按 [L, u, v] 交错存放
pub fn to_luv(image: &RgbImage) -> Vec<u8> {
    let mut out = Vec::with_capacity(image.as_raw().len());
    for p in image.pixels() {
        out.extend_from_slice(&rgb_to_luv(p[0], p[1], p[2]));
    }
    out
}

/// Working-image size after shrinking by `factor` (floored, never below 1).
pub fn scaled_dimensions(width: u32, height: u32, factor: u32) -> (u32, u32) {
    let factor = factor.max(1);
    ((width / factor).max(1), (height / factor).max(1))
}

pub fn downsample(image: &RgbImage, factor: u32) -> RgbImage {
    if factor <= 1 {
        return image.clone();
    }
    let (w, h) = scaled_dimensions(image.width(), image.height(), factor);
    imageops::resize(image, w, h, FilterType::Triangle)
}
