pub mod api;
pub mod core;
pub mod frame_extractor;

pub use crate::api::image::ImageCropper;
pub use crate::api::video::Video;
pub use crate::api::BatchItem;
pub use crate::core::config::Config;
pub use crate::core::error::{Result, ThumbError};

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("thumb_lib"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // try_init so repeated calls (tests, embedding apps) stay harmless
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("info"),
        )
        .try_init();
    }
}
