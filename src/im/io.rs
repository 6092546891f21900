use std::path::Path;

use super::core::{Im, Lum8Im};
use crate::error::{Error, Result};

// Raster I/O
// -----------------------------------------------------------------------------

/// Decode an image file (PNG, JPEG, ...) into an 8-bit grayscale raster.
pub fn load_lum8<P: AsRef<Path>>(path: P) -> Result<Lum8Im> {
    let img = image::open(path)?.into_luma8();
    let w = img.width() as usize;
    let h = img.height() as usize;
    if w == 0 || h == 0 {
        return Err(Error::InvalidArgument("zero-sized image".to_string()));
    }

    Ok(Im {
        w,
        h,
        s: w,
        arr: img.into_raw(),
    })
}

impl Lum8Im {
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let img = image::GrayImage::from_raw(self.w as u32, self.h as u32, self.arr.clone())
            .ok_or_else(|| {
                Error::InvalidArgument("image buffer does not match its dimensions".to_string())
            })?;

        img.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}
