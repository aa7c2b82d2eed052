pub mod config;
pub mod detector;
pub mod error;
pub mod image;
pub mod imaging;
pub mod video;
