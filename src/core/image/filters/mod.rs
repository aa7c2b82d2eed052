//! 裁剪框过滤器：先用原图 set_image 预计算，再逐个判定保留与否

pub mod text;

use crate::core::error::Result;
use crate::core::image::crop_rect::CropRect;
use image::RgbImage;

pub use text::TextFilter;

pub trait CropFilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Precompute whatever the filter needs from the full-resolution image.
    /// `None` leaves the filter in its pass-everything state.
    fn set_image(&mut self, image: Option<&RgbImage>) -> Result<()>;

    /// `true` keeps the crop.
    fn filter_result(&self, crop: &CropRect) -> bool;
}
