//! 逐帧读取视频：外部 ffmpeg 解码，或内存帧序列

use crate::core::config::VideoConfig;
use crate::core::error::{Result, ThumbError};
use image::RgbImage;
use log::{debug, error};
use serde::Deserialize;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

/// Sequential frame reader. `Ok(None)` marks the end of the stream.
pub trait FrameSource: Send {
    fn read(&mut self) -> Result<Option<RgbImage>>;
}

impl FrameSource for Box<dyn FrameSource> {
    fn read(&mut self) -> Result<Option<RgbImage>> {
        (**self).read()
    }
}

/// Opens a frame source for a video file.
pub trait FrameSourceFactory: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>>;
}

pub struct InMemorySource {
    frames: VecDeque<RgbImage>,
}

impl InMemorySource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for InMemorySource {
    fn read(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

fn probe_dimensions(ffprobe: &str, path: &Path) -> Result<(u32, u32)> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| ThumbError::external(ffprobe, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!("❌ ffprobe failed for {}: {}", path.display(), stderr.trim());
        return Err(ThumbError::external(ffprobe, stderr.trim().to_string()));
    }

    parse_dimensions(&output.stdout).ok_or_else(|| {
        ThumbError::external(ffprobe, format!("no video stream in {}", path.display()))
    })
}

fn parse_dimensions(json: &[u8]) -> Option<(u32, u32)> {
    let probe: ProbeOutput = serde_json::from_slice(json).ok()?;
    let stream = probe.streams.first()?;
    match (stream.width?, stream.height?) {
        (w, h) if w > 0 && h > 0 => Some((w, h)),
        _ => None,
    }
}

/// Decodes a file to raw RGB24 frames through an ffmpeg child process.
///
/// End of stream is only reported after the child exited successfully; a
/// non-zero exit or a truncated frame is an `ExternalTool` error.
pub struct FfmpegFrameSource {
    path: PathBuf,
    ffmpeg: String,
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    frames_read: u64,
    finished: bool,
}

impl FfmpegFrameSource {
    pub fn open(path: &Path, config: &VideoConfig) -> Result<Self> {
        let (width, height) = probe_dimensions(&config.ffprobe_binary, path)?;
        let ffmpeg = config.ffmpeg_binary.clone();

        let mut child = Command::new(&ffmpeg)
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ThumbError::external(&ffmpeg, e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ThumbError::external(&ffmpeg, "stdout not captured"))?;
        // stderr 单独线程读完，避免管道写满卡住解码
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        debug!("🎞️ Decoding {} at {}x{}", path.display(), width, height);
        Ok(Self {
            path: path.to_path_buf(),
            ffmpeg,
            child,
            stdout,
            stderr,
            width,
            height,
            frames_read: 0,
            finished: false,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Fills `buf` from the pipe, returning how many bytes were read before EOF.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        let status = self.child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if !status.success() {
            error!(
                "❌ ffmpeg decode failed for {} ({}): {}",
                self.path.display(),
                status,
                stderr.trim()
            );
            let message = if stderr.trim().is_empty() {
                format!("decoder exited with {}", status)
            } else {
                stderr.trim().to_string()
            };
            return Err(ThumbError::external(&self.ffmpeg, message));
        }
        Ok(())
    }
}

impl FrameSource for FfmpegFrameSource {
    fn read(&mut self) -> Result<Option<RgbImage>> {
        if self.finished {
            return Ok(None);
        }
        let mut buf = vec![0u8; self.frame_len()];
        let filled = self.fill(&mut buf)?;

        if filled == buf.len() {
            self.frames_read += 1;
            return RgbImage::from_raw(self.width, self.height, buf)
                .map(Some)
                .ok_or_else(|| ThumbError::external(&self.ffmpeg, "short frame buffer"));
        }

        self.finish()?;
        if filled > 0 {
            return Err(ThumbError::external(
                &self.ffmpeg,
                format!(
                    "truncated frame {} of {}: {} of {} bytes",
                    self.frames_read,
                    self.path.display(),
                    filled,
                    buf.len()
                ),
            ));
        }
        debug!(
            "🎞️ {} finished after {} frames",
            self.path.display(),
            self.frames_read
        );
        Ok(None)
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

pub struct FfmpegSourceFactory {
    config: VideoConfig,
}

impl FfmpegSourceFactory {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }
}

impl FrameSourceFactory for FfmpegSourceFactory {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(FfmpegFrameSource::open(path, &self.config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_source_drains() {
        let mut source = InMemorySource::new(vec![RgbImage::new(2, 2), RgbImage::new(2, 2)]);
        assert_eq!(source.remaining(), 2);
        assert!(source.read().unwrap().is_some());
        assert!(source.read().unwrap().is_some());
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_parse_probe_json() {
        let json = br#"{"programs":[],"streams":[{"width":1280,"height":720}]}"#;
        assert_eq!(parse_dimensions(json), Some((1280, 720)));
        assert_eq!(parse_dimensions(br#"{"streams":[]}"#), None);
        assert_eq!(parse_dimensions(br#"{"streams":[{"width":0,"height":720}]}"#), None);
        assert_eq!(parse_dimensions(b"not json"), None);
    }

    #[test]
    fn test_missing_binary_is_external_error() {
        let config = VideoConfig {
            ffprobe_binary: "/nonexistent/ffprobe-binary".into(),
            ..VideoConfig::default()
        };
        let err = FfmpegFrameSource::open(Path::new("clip.mp4"), &config).err().unwrap();
        assert!(matches!(err, ThumbError::ExternalTool { .. }));
    }

    #[cfg(unix)]
    mod stub_tools {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        pub(super) fn script(dir: &Path, name: &str, body: &str) -> String {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        /// 4x2 的视频流；解码脚本由调用方给出
        pub(super) fn config(dir: &Path, decoder_body: &str) -> VideoConfig {
            VideoConfig {
                ffprobe_binary: script(
                    dir,
                    "ffprobe",
                    r#"echo '{"streams":[{"width":4,"height":2}]}'"#,
                ),
                ffmpeg_binary: script(dir, "ffmpeg", decoder_body),
                ..VideoConfig::default()
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_decoder_failure_is_external_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = stub_tools::config(dir.path(), "echo 'Invalid data found' >&2; exit 1");
        let mut source = FfmpegFrameSource::open(Path::new("broken.mp4"), &config).unwrap();
        match source.read() {
            Err(ThumbError::ExternalTool { message, .. }) => {
                assert!(message.contains("Invalid data found"), "{}", message)
            }
            other => panic!("expected decoder error, got {:?}", other.map(|f| f.is_some())),
        }
        assert!(source.read().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_truncated_frame_is_error() {
        let dir = tempfile::tempdir().unwrap();
        // 一帧 24 字节，只输出 30 字节
        let config = stub_tools::config(dir.path(), "printf '%030d' 0");
        let mut source = FfmpegFrameSource::open(Path::new("cut.mp4"), &config).unwrap();
        assert!(source.read().unwrap().is_some());
        let err = source.read().unwrap_err();
        assert!(matches!(err, ThumbError::ExternalTool { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_exit_ends_stream() {
        let dir = tempfile::tempdir().unwrap();
        let config = stub_tools::config(dir.path(), "printf '%048d' 0");
        let mut source = FfmpegFrameSource::open(Path::new("ok.mp4"), &config).unwrap();
        assert_eq!(source.dimensions(), (4, 2));
        assert!(source.read().unwrap().is_some());
        assert!(source.read().unwrap().is_some());
        assert!(source.read().unwrap().is_none());
    }
}
