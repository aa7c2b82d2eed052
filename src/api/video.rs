//! 视频关键帧提取

use crate::api::{collect_files, validate_file, BatchItem};
use crate::core::config::Config;
use crate::core::error::{Result, ThumbError};
use crate::core::video::{
    plan_subclips, FfmpegSourceFactory, FfmpegTranscoder, Frame, FrameSource, FrameSourceFactory,
    Transcoder,
};
use crate::frame_extractor::{FrameExtractor, ImageSelector, Selection};
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// 关键帧提取入口，线程池创建一次后复用
///
/// ```ignore
/// let video = Video::new(Config::default())?;
/// let frames = video.extract_video_keyframes(Path::new("pos_video.mp4"), 12)?;
/// ```
pub struct Video {
    config: Config,
    pool: ThreadPool,
    transcoder: Arc<dyn Transcoder>,
    sources: Arc<dyn FrameSourceFactory>,
}

impl Video {
    /// Uses ffmpeg/ffprobe subprocesses for splitting and decoding.
    pub fn new(config: Config) -> Result<Self> {
        let transcoder = Arc::new(FfmpegTranscoder::new(&config.video));
        let sources = Arc::new(FfmpegSourceFactory::new(config.video.clone()));
        Self::with_backends(config, transcoder, sources)
    }

    pub fn with_backends(
        config: Config,
        transcoder: Arc<dyn Transcoder>,
        sources: Arc<dyn FrameSourceFactory>,
    ) -> Result<Self> {
        config.validate()?;
        let workers = config
            .video
            .workers
            .unwrap_or_else(|| (num_cpus::get() / 2).max(1));
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("thumb-worker-{}", i))
            .build()
            .map_err(|e| ThumbError::Configuration(format!("failed to build worker pool: {}", e)))?;
        info!("🎬 Video: created with {} workers", workers);
        Ok(Self {
            config,
            pool,
            transcoder,
            sources,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn candidates_from(&self, source: Box<dyn FrameSource>) -> Result<Vec<Frame>> {
        FrameExtractor::new(&self.config.frame_extractor).extract_candidate_frames(source)
    }

    fn select(&self, candidates: Vec<Frame>, n: usize) -> Selection {
        let selector = ImageSelector::new(self.config.image_selector.clone());
        let selection = selector.select_best_frames(&self.pool, candidates, n);
        debug!("🔍 Selection path: {:?}", selection.path);
        selection
    }

    /// Key-frames from already opened sources, treated as consecutive parts
    /// of one video. Candidates are gathered per source in parallel and
    /// concatenated in source order before selection.
    pub fn extract_keyframes_from_sources(
        &self,
        sources: Vec<Box<dyn FrameSource>>,
        n: usize,
    ) -> Result<Selection> {
        let per_source: Vec<Vec<Frame>> = self.pool.install(|| {
            sources
                .into_par_iter()
                .map(|source| self.candidates_from(source))
                .collect::<Result<Vec<_>>>()
        })?;
        let candidates: Vec<Frame> = per_source.into_iter().flatten().collect();
        info!("🎞️ {} candidate frames", candidates.len());
        Ok(self.select(candidates, n))
    }

    /// Up to `n` diverse key-frames of the video at `path`.
    ///
    /// The video is split into sub-clips in a temporary directory, one task
    /// per clip; the directory is removed when this returns.
    pub fn extract_video_keyframes(&self, path: &Path, n: usize) -> Result<Vec<Frame>> {
        validate_file(path)?;
        let start = Instant::now();

        let duration = self.transcoder.duration(path)?;
        let spans = plan_subclips(duration, num_cpus::get(), self.config.video.min_video_duration);
        info!(
            "🎬 {}: {:.2}s split into {} clips",
            path.display(),
            duration,
            spans.len()
        );

        let mut builder = tempfile::Builder::new();
        builder.prefix("thumb_clips_");
        let workdir = match &self.config.video.temp_dir {
            Some(dir) => builder.tempdir_in(dir)?,
            None => builder.tempdir()?,
        };
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("mp4");

        let per_clip: Vec<Vec<Frame>> = self.pool.install(|| {
            spans
                .par_iter()
                .enumerate()
                .map(|(i, span)| {
                    let target = workdir.path().join(format!("clip_{:03}.{}", i, ext));
                    self.transcoder
                        .extract_subclip(path, span.start, span.end, &target)?;
                    let frames = self.candidates_from(self.sources.open(&target)?)?;
                    debug!("🔍 Clip {} ({:.2}s): {} candidates", i, span.duration(), frames.len());
                    Ok(frames)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let candidates: Vec<Frame> = per_clip.into_iter().flatten().collect();
        let selection = self.select(candidates, n);
        info!(
            "🎞️ {}: {} key-frames in {:?}",
            path.display(),
            selection.frames.len(),
            start.elapsed()
        );
        Ok(selection.frames)
    }

    /// Key-frames for every video under `dir` with a configured extension.
    /// Each video gets its own item; one failure does not stop the rest.
    pub fn extract_video_keyframes_from_dir(
        &self,
        dir: &Path,
        n: usize,
    ) -> Result<Vec<BatchItem<Vec<Frame>>>> {
        let files = collect_files(dir, &self.config.video.extensions)?;
        info!("📦 Extracting key-frames from {} videos in {}", files.len(), dir.display());
        Ok(files
            .into_iter()
            .map(|path| {
                let result = self.extract_video_keyframes(&path, n);
                if let Err(e) = &result {
                    warn!("⚠️ {}: {}", path.display(), e);
                }
                BatchItem::from_result(path, result)
            })
            .collect())
    }
}
