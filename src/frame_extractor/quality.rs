//! Per-frame quality measures used by the diversity selector.

use image::{GrayImage, RgbImage};

/// Mean of the HSV value channel (`max(r, g, b)`), scaled to 0–100.
pub fn brightness_score(image: &RgbImage) -> f64 {
    let n = image.width() as u64 * image.height() as u64;
    if n == 0 {
        return 0.0;
    }
    let sum: u64 = image
        .pixels()
        .map(|p| p[0].max(p[1]).max(p[2]) as u64)
        .sum();
    sum as f64 * 100.0 / (n as f64 * 255.0)
}

/// Horizontal half-widths of a disk footprint, indexed by `dy + radius`.
fn disk_half_widths(radius: u32) -> Vec<i64> {
    let r = radius as i64;
    (-r..=r)
        .map(|dy| ((r * r - dy * dy) as f64).sqrt().floor() as i64)
        .collect()
}

/// Mean local entropy (bits) over a disk neighbourhood of `radius`.
/// Neighbours outside the image are not counted.
pub fn entropy_score(gray: &GrayImage, radius: u32) -> f64 {
    let (w, h) = (gray.width() as i64, gray.height() as i64);
    if w == 0 || h == 0 {
        return 0.0;
    }
    let r = radius as i64;
    let half = disk_half_widths(radius);
    let max_count = half.iter().map(|hw| 2 * hw + 1).sum::<i64>() as usize;
    // c·log2(c)
    let clog: Vec<f64> = (0..=max_count)
        .map(|c| if c == 0 { 0.0 } else { c as f64 * (c as f64).log2() })
        .collect();
    let px = |x: i64, y: i64| gray.get_pixel(x as u32, y as u32)[0] as usize;

    let mut total = 0.0;
    let mut hist = [0usize; 256];
    for y in 0..h {
        hist.iter_mut().for_each(|c| *c = 0);
        let mut count = 0usize;
        let mut s = 0.0;

        let add = |v: usize, hist: &mut [usize; 256], count: &mut usize, s: &mut f64| {
            let c = hist[v];
            *s += clog[c + 1] - clog[c];
            hist[v] = c + 1;
            *count += 1;
        };
        let remove = |v: usize, hist: &mut [usize; 256], count: &mut usize, s: &mut f64| {
            let c = hist[v];
            *s += clog[c - 1] - clog[c];
            hist[v] = c - 1;
            *count -= 1;
        };

        for (i, hw) in half.iter().enumerate() {
            let yy = y + i as i64 - r;
            if yy < 0 || yy >= h {
                continue;
            }
            for xx in 0..=(*hw).min(w - 1) {
                add(px(xx, yy), &mut hist, &mut count, &mut s);
            }
        }

        for x in 0..w {
            if x > 0 {
                for (i, hw) in half.iter().enumerate() {
                    let yy = y + i as i64 - r;
                    if yy < 0 || yy >= h {
                        continue;
                    }
                    let out = x - 1 - hw;
                    if out >= 0 {
                        remove(px(out, yy), &mut hist, &mut count, &mut s);
                    }
                    let inn = x + hw;
                    if inn < w {
                        add(px(inn, yy), &mut hist, &mut count, &mut s);
                    }
                }
            }
            let n = count as f64;
            total += n.log2() - s / n;
        }
    }
    total / (w * h) as f64
}

/// Variance of the 4-neighbour Laplacian, borders mirrored without repeating
/// the edge pixel.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = (gray.width() as i64, gray.height() as i64);
    if w == 0 || h == 0 {
        return 0.0;
    }
    let reflect = |i: i64, n: i64| -> i64 {
        if n == 1 {
            0
        } else if i < 0 {
            -i
        } else if i >= n {
            2 * n - 2 - i
        } else {
            i
        }
    };
    let at = |x: i64, y: i64| gray.get_pixel(reflect(x, w) as u32, reflect(y, h) as u32)[0] as f64;

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..h {
        for x in 0..w {
            let v = at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y);
            sum += v;
            sum_sq += v * v;
        }
    }
    let n = (w * h) as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}
