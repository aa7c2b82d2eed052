//! Windowed convolution smoother for the frame-difference signal.

use crate::core::error::{Result, ThumbError};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Flat,
    Hanning,
    Hamming,
    Bartlett,
    Blackman,
}

impl WindowKind {
    /// Window coefficients of length `len` (symmetric, endpoints included).
    pub fn coefficients(&self, len: usize) -> Vec<f64> {
        if len == 1 {
            return vec![1.0];
        }
        let m = (len - 1) as f64;
        (0..len)
            .map(|n| {
                let n = n as f64;
                match self {
                    WindowKind::Flat => 1.0,
                    WindowKind::Hanning => 0.5 - 0.5 * (2.0 * PI * n / m).cos(),
                    WindowKind::Hamming => 0.54 - 0.46 * (2.0 * PI * n / m).cos(),
                    WindowKind::Bartlett => (2.0 / m) * (m / 2.0 - (n - m / 2.0).abs()),
                    WindowKind::Blackman => {
                        0.42 - 0.5 * (2.0 * PI * n / m).cos() + 0.08 * (4.0 * PI * n / m).cos()
                    }
                }
            })
            .collect()
    }
}

impl FromStr for WindowKind {
    type Err = ThumbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(WindowKind::Flat),
            "hanning" => Ok(WindowKind::Hanning),
            "hamming" => Ok(WindowKind::Hamming),
            "bartlett" => Ok(WindowKind::Bartlett),
            "blackman" => Ok(WindowKind::Blackman),
            other => Err(ThumbError::Configuration(format!(
                "unknown smoothing window '{}'",
                other
            ))),
        }
    }
}

/// Smooths `signal` with a normalized window of `window_len` samples.
///
/// Both ends are padded with `window_len - 1` point-reflected samples
/// (`2·x[0] − x[k]` for k = w..2 on the left, `2·x[n-1] − x[n-1-k]` for
/// k = 0..w-2 on the right), so a constant signal comes back unchanged. Output has
/// the same length as the input. A window shorter than 3 returns the input
/// as is; a signal shorter than the window is an `InvalidSignal` error.
pub fn smooth(signal: &[f64], window_len: usize, kind: WindowKind) -> Result<Vec<f64>> {
    let n = signal.len();
    if n < window_len {
        return Err(ThumbError::InvalidSignal(format!(
            "signal of {} samples is shorter than window {}",
            n, window_len
        )));
    }
    if window_len < 3 {
        return Ok(signal.to_vec());
    }

    let first = signal[0];
    let last = signal[n - 1];
    let mut padded = Vec::with_capacity(n + 2 * (window_len - 1));
    // 左端：x[w], x[w-1], ..., x[2]（下标越界时截到末尾）
    for k in (2..=window_len.min(n - 1)).rev() {
        padded.push(2.0 * first - signal[k]);
    }
    padded.extend_from_slice(signal);
    // 右端：x[n-1], x[n-2], ..., x[n-w+1]
    for k in 0..window_len - 1 {
        padded.push(2.0 * last - signal[n - 1 - k]);
    }

    let window = kind.coefficients(window_len);
    let total: f64 = window.iter().sum();
    let window: Vec<f64> = window.iter().map(|w| w / total).collect();

    // "same" 卷积：完整卷积从 (M-1)/2 处截取 len(padded) 个点
    let offset = (window_len - 1) / 2;
    let same: Vec<f64> = (offset..offset + padded.len())
        .map(|k| {
            let lo = k.saturating_sub(padded.len() - 1);
            let hi = k.min(window_len - 1);
            (lo..=hi).map(|j| window[j] * padded[k - j]).sum()
        })
        .collect();

    let start = window_len - 1;
    Ok(same[start..(start + n).min(same.len())].to_vec())
}
