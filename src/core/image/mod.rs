//! 图像裁剪：候选框生成、特征打分、过滤与排序

pub mod aspect;
pub mod candidates;
pub mod crop_rect;
pub mod extractor;
pub mod features;
pub mod filters;
pub mod registry;
pub mod scorer;
pub mod selector;

pub use aspect::{crop_specs, AspectRatio};
pub use candidates::{Candidate, CandidateGenerator};
pub use crop_rect::CropRect;
pub use extractor::CropExtractor;
pub use features::{Feature, FeatureKind};
pub use filters::CropFilter;
pub use registry::ModelProviders;
pub use scorer::{CropScorer, FeatureStack};
pub use selector::{prepare_filters, rank_crops, select_candidate_crops, sort_by_score};
