use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThumbError {
    #[error("Invalid input: {0}")]
    InputValidation(String),
    #[error(
        "No crop candidate fits: crop {crop_width:.1}x{crop_height:.1} in image {image_width}x{image_height}"
    )]
    EmptyCandidateSet {
        crop_width: f64,
        crop_height: f64,
        image_width: u32,
        image_height: u32,
    },
    #[error("Invalid signal: {0}")]
    InvalidSignal(String),
    #[error("External tool `{tool}` failed: {message}")]
    ExternalTool { tool: String, message: String },
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl ThumbError {
    pub fn external(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ThumbError::ExternalTool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// "Nothing fits" is an expected outcome, not a processing failure.
    pub fn is_empty_candidate_set(&self) -> bool {
        matches!(self, ThumbError::EmptyCandidateSet { .. })
    }
}

pub type Result<T> = std::result::Result<T, ThumbError>;
