use crate::core::config::FrameExtractorConfig;
use crate::core::error::Result;
use crate::core::video::{Frame, FrameSource};
use crate::frame_extractor::difference::{Chunk, FrameDifferenceChunks};
use crate::frame_extractor::smoothing::{smooth, WindowKind};
use log::{debug, warn};

/// Indices strictly greater than both neighbours. Endpoints never qualify.
pub fn local_maxima(signal: &[f64]) -> Vec<usize> {
    if signal.len() < 3 {
        return Vec::new();
    }
    (1..signal.len() - 1)
        .filter(|&i| signal[i] > signal[i - 1] && signal[i] > signal[i + 1])
        .collect()
}

/// 候选关键帧提取：分块差分 → 平滑 → 局部极大值
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    len_window: usize,
    window_type: WindowKind,
    max_frames_in_chunk: usize,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new(&FrameExtractorConfig::default())
    }
}

impl FrameExtractor {
    pub fn new(config: &FrameExtractorConfig) -> Self {
        Self {
            len_window: config.len_window,
            window_type: config.window_type,
            max_frames_in_chunk: config.max_frames_in_chunk,
        }
    }

    /// Candidate frames of one chunk.
    ///
    /// For a maximum at index `i` of the smoothed series the frame at `i - 1`
    /// is reported, one step behind the frame the distance was recorded on.
    /// The offset is kept as is; see `test_reports_frame_before_peak`.
    pub fn frames_in_local_maxima(&self, chunk: Chunk) -> Vec<Frame> {
        let diffs = chunk.differences();
        let smoothed = match smooth(&diffs, self.len_window, self.window_type) {
            Ok(s) => s,
            Err(e) => {
                warn!(
                    "⚠️ Chunk {}: {}, using unsmoothed differences",
                    chunk.index, e
                );
                diffs
            }
        };

        let peaks = local_maxima(&smoothed);
        let mut slots: Vec<Option<Frame>> = chunk.frames.into_iter().map(Some).collect();
        peaks
            .into_iter()
            .filter_map(|i| slots.get_mut(i - 1).and_then(Option::take))
            .collect()
    }

    /// All candidate key-frames of a source, in chunk order.
    pub fn extract_candidate_frames<S: FrameSource>(&self, source: S) -> Result<Vec<Frame>> {
        let mut candidates = Vec::new();
        for chunk in FrameDifferenceChunks::new(source, self.max_frames_in_chunk) {
            let chunk = chunk?;
            let index = chunk.index;
            let found = self.frames_in_local_maxima(chunk);
            debug!("🔍 Chunk {}: {} candidate frames", index, found.len());
            candidates.extend(found);
        }
        Ok(candidates)
    }
}
