//! Vertical stitching of several images into one

use std::path::{Path, PathBuf};

use image::{imageops, RgbImage};
use tracing::debug;

use super::ImageCodec;
use crate::error::{Error, Result};

/// Stack the images at `paths` top to bottom, in order
///
/// The canvas is as wide as the widest input and as tall as all inputs
/// together. Narrower images sit at x = 0; the uncovered area stays black.
/// The first image that fails to decode aborts the whole stitch.
pub fn stitch_images<C: ImageCodec + ?Sized>(codec: &C, paths: &[PathBuf]) -> Result<RgbImage> {
    if paths.is_empty() {
        return Err(Error::NoInputs);
    }

    let mut images = Vec::with_capacity(paths.len());
    let mut width: u32 = 0;
    let mut height: u32 = 0;

    for path in paths {
        let img = codec.decode(path)?.into_rgb8();
        width = width.max(img.width());
        height = height.checked_add(img.height()).ok_or_else(|| {
            Error::General(format!(
                "Stitched height overflows at {}",
                path.display()
            ))
        })?;
        images.push(img);
    }

    let mut canvas = RgbImage::new(width, height);
    let mut y_offset: i64 = 0;
    for img in &images {
        imageops::replace(&mut canvas, img, 0, y_offset);
        y_offset += i64::from(img.height());
    }

    debug!(count = images.len(), width, height, "stitched images");
    Ok(canvas)
}

/// Stitch `paths` and encode the result to `dest`, returning its dimensions
pub fn stitch_to_file<C: ImageCodec + ?Sized>(
    codec: &C,
    paths: &[PathBuf],
    dest: &Path,
) -> Result<(u32, u32)> {
    let canvas = stitch_images(codec, paths)?;
    codec.encode(&canvas, dest)?;
    Ok(canvas.dimensions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb};
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Codec serving solid-colour images from memory
    #[derive(Default)]
    struct MemoryCodec {
        images: HashMap<PathBuf, RgbImage>,
        encoded: RefCell<Vec<(PathBuf, (u32, u32))>>,
    }

    impl MemoryCodec {
        fn with(mut self, name: &str, width: u32, height: u32, colour: [u8; 3]) -> Self {
            self.images
                .insert(PathBuf::from(name), RgbImage::from_pixel(width, height, Rgb(colour)));
            self
        }
    }

    impl ImageCodec for MemoryCodec {
        fn decode(&self, path: &Path) -> Result<DynamicImage> {
            self.images
                .get(path)
                .cloned()
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))
        }

        fn encode(&self, image: &RgbImage, path: &Path) -> Result<()> {
            self.encoded
                .borrow_mut()
                .push((path.to_path_buf(), image.dimensions()));
            Ok(())
        }
    }

    const RED: [u8; 3] = [255, 0, 0];
    const BLUE: [u8; 3] = [0, 0, 255];

    #[test]
    fn test_two_images_stack_vertically() {
        let codec = MemoryCodec::default()
            .with("a.jpg", 100, 50, RED)
            .with("b.jpg", 80, 60, BLUE);
        let paths = vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")];

        let canvas = stitch_images(&codec, &paths).unwrap();

        assert_eq!(canvas.dimensions(), (100, 110));
        assert_eq!(canvas.get_pixel(0, 0).0, RED);
        assert_eq!(canvas.get_pixel(99, 49).0, RED);
        assert_eq!(canvas.get_pixel(0, 50).0, BLUE);
        assert_eq!(canvas.get_pixel(79, 109).0, BLUE);
        // Right of the narrower image is left unpainted
        assert_eq!(canvas.get_pixel(80, 50).0, [0, 0, 0]);
        assert_eq!(canvas.get_pixel(99, 109).0, [0, 0, 0]);
    }

    #[test]
    fn test_order_follows_input() {
        let codec = MemoryCodec::default()
            .with("a.jpg", 10, 5, RED)
            .with("b.jpg", 10, 5, BLUE);
        let paths = vec![PathBuf::from("b.jpg"), PathBuf::from("a.jpg")];

        let canvas = stitch_images(&codec, &paths).unwrap();

        assert_eq!(canvas.get_pixel(0, 0).0, BLUE);
        assert_eq!(canvas.get_pixel(0, 5).0, RED);
    }

    #[test]
    fn test_decode_failure_aborts_without_output() {
        let codec = MemoryCodec::default().with("a.jpg", 10, 10, RED);
        let paths = vec![PathBuf::from("a.jpg"), PathBuf::from("missing.jpg")];

        let result = stitch_to_file(&codec, &paths, Path::new("out.jpg"));

        assert!(matches!(result, Err(Error::FileNotFound(ref p)) if p == Path::new("missing.jpg")));
        assert!(codec.encoded.borrow().is_empty());
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let codec = MemoryCodec::default();
        assert!(matches!(stitch_images(&codec, &[]), Err(Error::NoInputs)));
    }

    #[test]
    fn test_stitch_to_file_encodes_once() {
        let codec = MemoryCodec::default()
            .with("a.jpg", 4, 3, RED)
            .with("b.jpg", 6, 2, BLUE);
        let paths = vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")];

        let dims = stitch_to_file(&codec, &paths, Path::new("laudos_merged.jpg")).unwrap();

        assert_eq!(dims, (6, 5));
        assert_eq!(
            codec.encoded.borrow().as_slice(),
            &[(PathBuf::from("laudos_merged.jpg"), (6, 5))]
        );
    }

    proptest! {
        #[test]
        fn prop_canvas_is_max_width_by_total_height(
            sizes in prop::collection::vec((1u32..40, 1u32..40), 1..6)
        ) {
            let mut codec = MemoryCodec::default();
            let mut paths = Vec::new();
            for (i, (w, h)) in sizes.iter().enumerate() {
                let name = format!("{}.jpg", i);
                codec = codec.with(&name, *w, *h, RED);
                paths.push(PathBuf::from(name));
            }

            let canvas = stitch_images(&codec, &paths).unwrap();

            let max_width = sizes.iter().map(|(w, _)| *w).max().unwrap();
            let total_height: u32 = sizes.iter().map(|(_, h)| *h).sum();
            prop_assert_eq!(canvas.dimensions(), (max_width, total_height));

            // Each band's first row is painted at the cumulative offset
            let mut y = 0;
            for (_, h) in &sizes {
                prop_assert_eq!(canvas.get_pixel(0, y).0, RED);
                y += h;
            }
        }
    }
}
