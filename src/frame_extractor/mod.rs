//! 视频关键帧提取
//!
//! 1. 分块计算相邻帧 LUV 差异
//! 2. 平滑差异曲线，取局部极大值对应的候选帧
//! 3. 质量过滤 + 直方图聚类，每簇保留最清晰的一帧

pub mod difference;
pub mod kmeans;
pub mod pipeline;
pub mod quality;
pub mod selector;
pub mod smoothing;

pub use difference::{luv_distance, Chunk, FrameDifferenceChunks};
pub use kmeans::{Clustering, KMeans};
pub use pipeline::{local_maxima, FrameExtractor};
pub use selector::{ImageSelector, Selection, SelectionPath};
pub use smoothing::{smooth, WindowKind};
