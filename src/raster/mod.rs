//! Raster image handling: JPEG codec and vertical stitching

pub mod stitch;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader, RgbImage};

use crate::config::DEFAULT_JPEG_QUALITY;
use crate::error::{Error, Result};

// Re-export commonly used items
pub use stitch::{stitch_images, stitch_to_file};

/// Decodes input rasters and encodes the stitched result
pub trait ImageCodec {
    /// Decode the image stored at `path`
    fn decode(&self, path: &Path) -> Result<DynamicImage>;

    /// Encode `image` to `path`, replacing any existing file
    fn encode(&self, image: &RgbImage, path: &Path) -> Result<()>;
}

/// JPEG codec backed by the `image` crate
#[derive(Debug, Clone, Copy)]
pub struct JpegCodec {
    /// Encoder quality (1-100)
    pub quality: u8,
}

impl JpegCodec {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl ImageCodec for JpegCodec {
    fn decode(&self, path: &Path) -> Result<DynamicImage> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        // Sniff the content so a PNG saved as .jpg still decodes
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        reader.decode().map_err(|e| Error::image(path, e))
    }

    fn encode(&self, image: &RgbImage, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        JpegEncoder::new_with_quality(&mut writer, self.quality)
            .encode_image(image)
            .map_err(|e| Error::image(path, e))?;
        writer.flush()?;
        Ok(())
    }
}
