//! Chunked frame differencing.
//!
//! Frames are read sequentially in chunks of at most `max_frames_in_chunk`.
//! Inside a chunk every frame after the first is paired with its predecessor
//! in L*u*v* space; the first frame of each chunk only seeds the comparison.

use crate::core::error::{Result, ThumbError};
use crate::core::imaging::to_luv;
use crate::core::video::{Frame, FrameSource};
use log::debug;

/// 一个分块：帧及其与前一帧的距离
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub frames: Vec<Frame>,
}

impl Chunk {
    pub fn differences(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.difference_score).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Sum of absolute per-channel differences of two L*u*v* buffers.
pub fn luv_distance(a: &[u8], b: &[u8]) -> u64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.abs_diff(*y) as u64)
        .sum()
}

/// Finite, single-pass iterator over difference chunks of a frame source.
pub struct FrameDifferenceChunks<S: FrameSource> {
    source: S,
    max_frames_in_chunk: usize,
    chunk_index: usize,
    frame_number: u64,
    finished: bool,
}

impl<S: FrameSource> FrameDifferenceChunks<S> {
    pub fn new(source: S, max_frames_in_chunk: usize) -> Self {
        Self {
            source,
            max_frames_in_chunk: max_frames_in_chunk.max(1),
            chunk_index: 0,
            frame_number: 0,
            finished: false,
        }
    }

    /// Frames consumed from the source so far.
    pub fn frames_read(&self) -> u64 {
        self.frame_number
    }

    fn read_chunk(&mut self) -> Result<Option<Chunk>> {
        let mut prev: Option<(Vec<u8>, (u32, u32))> = None;
        let mut frames = Vec::new();
        let mut read = 0;

        while read < self.max_frames_in_chunk {
            let Some(image) = self.source.read()? else {
                self.finished = true;
                break;
            };
            let luv = to_luv(&image);
            let dims = image.dimensions();
            if let Some((prev_luv, prev_dims)) = &prev {
                if *prev_dims != dims {
                    return Err(ThumbError::InputValidation(format!(
                        "frame {} is {}x{}, previous frame was {}x{}",
                        self.frame_number, dims.0, dims.1, prev_dims.0, prev_dims.1
                    )));
                }
                let distance = luv_distance(prev_luv, &luv) as f64;
                frames.push(Frame::new(image, self.frame_number).with_difference(distance));
            }
            prev = Some((luv, dims));
            self.frame_number += 1;
            read += 1;
        }

        if read == 0 {
            return Ok(None);
        }
        let chunk = Chunk {
            index: self.chunk_index,
            frames,
        };
        debug!(
            "📦 Chunk {}: {} frames read, {} differences",
            chunk.index,
            read,
            chunk.len()
        );
        self.chunk_index += 1;
        Ok(Some(chunk))
    }
}

impl<S: FrameSource> Iterator for FrameDifferenceChunks<S> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
