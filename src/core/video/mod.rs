pub mod frame;
pub mod source;
pub mod transcoder;

pub use frame::Frame;
pub use source::{
    FfmpegFrameSource, FfmpegSourceFactory, FrameSource, FrameSourceFactory, InMemorySource,
};
pub use transcoder::{plan_subclips, ClipSpan, FfmpegTranscoder, Transcoder};
