//! 外部转码器：查询时长、按时间段切分子片段

use crate::core::config::VideoConfig;
use crate::core::error::{Result, ThumbError};
use log::{debug, error};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

/// Sub-clips shorter than this per core fall back to fixed-length clips.
const MIN_BREAK_SECONDS: f64 = 15.0;
const DEFAULT_BREAK_SECONDS: f64 = 25.0;

pub trait Transcoder: Send + Sync {
    /// Total duration in seconds.
    fn duration(&self, path: &Path) -> Result<f64>;

    /// Writes a playable clip of `[start, end)` seconds to `target`.
    fn extract_subclip(&self, path: &Path, start: f64, end: f64, target: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipSpan {
    pub start: f64,
    pub end: f64,
}

impl ClipSpan {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Splits `[0, duration)` into consecutive spans. Span length is
/// `floor(duration / cpu_count)` when that exceeds 15 s, otherwise 25 s. A
/// span whose end would leave less than `min_video_duration` is stretched to
/// the end of the video.
pub fn plan_subclips(duration: f64, cpu_count: usize, min_video_duration: f64) -> Vec<ClipSpan> {
    if !(duration > 0.0) {
        return Vec::new();
    }
    let per_core = (duration / cpu_count.max(1) as f64).floor();
    let break_point = if per_core > MIN_BREAK_SECONDS {
        per_core
    } else {
        DEFAULT_BREAK_SECONDS
    };

    let mut spans = Vec::new();
    let mut start = 0.0;
    while start < duration {
        let mut end = start + break_point;
        if end > duration || end + min_video_duration > duration {
            end = duration;
        }
        spans.push(ClipSpan { start, end });
        start = end;
    }
    spans
}

#[derive(Debug, Deserialize)]
struct FormatProbe {
    format: FormatInfo,
}

#[derive(Debug, Deserialize)]
struct FormatInfo {
    duration: String,
}

fn parse_duration(json: &[u8]) -> Option<f64> {
    let probe: FormatProbe = serde_json::from_slice(json).ok()?;
    probe.format.duration.trim().parse::<f64>().ok().filter(|d| *d >= 0.0)
}

pub struct FfmpegTranscoder {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegTranscoder {
    pub fn new(config: &VideoConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_binary.clone(),
            ffprobe: config.ffprobe_binary.clone(),
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn duration(&self, path: &Path) -> Result<f64> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
            .arg(path)
            .output()
            .map_err(|e| ThumbError::external(&self.ffprobe, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("❌ ffprobe failed for {}: {}", path.display(), stderr.trim());
            return Err(ThumbError::external(&self.ffprobe, stderr.trim().to_string()));
        }

        parse_duration(&output.stdout).ok_or_else(|| {
            ThumbError::external(&self.ffprobe, format!("no duration for {}", path.display()))
        })
    }

    fn extract_subclip(&self, path: &Path, start: f64, end: f64, target: &Path) -> Result<()> {
        debug!(
            "✂️ Sub-clip {:.2}s..{:.2}s of {} -> {}",
            start,
            end,
            path.display(),
            target.display()
        );
        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-y", "-i"])
            .arg(path)
            .args(["-ss", &format!("{:.2}", start)])
            .args(["-t", &format!("{:.2}", end - start)])
            .args(["-vcodec", "copy", "-acodec", "copy"])
            .arg(target)
            .output()
            .map_err(|e| ThumbError::external(&self.ffmpeg, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("❌ ffmpeg sub-clip failed for {}: {}", path.display(), stderr.trim());
            return Err(ThumbError::external(&self.ffmpeg, stderr.trim().to_string()));
        }
        Ok(())
    }
}
