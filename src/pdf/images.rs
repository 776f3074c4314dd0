//! Building a PDF out of JPG images, one page per image

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::{JpegDecoder, JpegEncoder};
use image::{ImageDecoder, ImageFormat, ImageReader};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tracing::debug;

use super::merge::MergeOptions;
use crate::config::DEFAULT_JPEG_QUALITY;
use crate::error::{Error, Result};

/// A JPEG payload ready to be embedded with the DCTDecode filter
struct EmbeddedJpeg {
    width: u32,
    height: u32,
    color_space: &'static str,
    data: Vec<u8>,
}

impl EmbeddedJpeg {
    /// Load `path`, keeping the original bytes when they are a plain grey or RGB JPEG
    fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;

        if let Some((width, height, color_space)) = Self::probe_jpeg(path, &bytes)? {
            return Ok(Self {
                width,
                height,
                color_space,
                data: bytes,
            });
        }

        debug!(file = %path.display(), "re-encoding image as RGB JPEG");
        Self::reencode(path, &bytes)
    }

    /// Dimensions and PDF colour space of a JPEG that can be embedded as-is
    fn probe_jpeg(path: &Path, bytes: &[u8]) -> Result<Option<(u32, u32, &'static str)>> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        if reader.format() != Some(ImageFormat::Jpeg) {
            return Ok(None);
        }

        let decoder = JpegDecoder::new(Cursor::new(bytes)).map_err(|e| Error::image(path, e))?;
        let (width, height) = decoder.dimensions();
        Ok(frame_components(bytes)
            .and_then(embeddable_color_space)
            .map(|color_space| (width, height, color_space)))
    }

    fn reencode(path: &Path, bytes: &[u8]) -> Result<Self> {
        let rgb = image::load_from_memory(bytes)
            .map_err(|e| Error::image(path, e))?
            .into_rgb8();
        let mut data = Vec::new();
        JpegEncoder::new_with_quality(&mut data, DEFAULT_JPEG_QUALITY)
            .encode_image(&rgb)
            .map_err(|e| Error::image(path, e))?;
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            color_space: "DeviceRGB",
            data,
        })
    }
}

/// PDF colour space for DCT data with `components` channels, if it can be shown unchanged
fn embeddable_color_space(components: u8) -> Option<&'static str> {
    match components {
        1 => Some("DeviceGray"),
        3 => Some("DeviceRGB"),
        _ => None,
    }
}

/// Component count from the first SOF frame header of a JPEG stream
///
/// The decoder reports the colour type it converts to, so CMYK and YCCK scans
/// look like RGB there while their DCT data carries four components.
fn frame_components(bytes: &[u8]) -> Option<u8> {
    if bytes.get(..2)? != [0xFF, 0xD8] {
        return None;
    }
    let mut i = 2;
    loop {
        if *bytes.get(i)? != 0xFF {
            return None;
        }
        while *bytes.get(i)? == 0xFF {
            i += 1;
        }
        let marker = *bytes.get(i)?;
        i += 1;
        match marker {
            0x01 | 0xD0..=0xD7 => continue,
            // Start of scan: no frame header before the image data
            0xD9 | 0xDA => return None,
            _ => {}
        }
        let len = usize::from(u16::from_be_bytes([*bytes.get(i)?, *bytes.get(i + 1)?]));
        if matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            // length(2) precision(1) height(2) width(2) components(1)
            return bytes.get(i + 7).copied();
        }
        i += len;
    }
}

/// Create a PDF with one page per input image, returning the page count
///
/// Each page is sized to its image, one point per pixel, and shows the image
/// full-bleed. Pages follow input order.
pub fn import_images(options: &MergeOptions) -> Result<usize> {
    options.validate()?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(options.input_paths.len());

    for path in &options.input_paths {
        let jpeg = EmbeddedJpeg::load(path)?;
        let (width, height) = (i64::from(jpeg.width), i64::from(jpeg.height));

        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => jpeg.color_space,
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg.data,
        )
        .with_compression(false);
        let image_id = doc.add_object(image_stream);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![width.into(), 0.into(), 0.into(), height.into(), 0.into(), 0.into()],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => Object::Array(vec![0.into(), 0.into(), width.into(), height.into()]),
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        debug!(file = %path.display(), width, height, "imported image page");
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.compress();
    doc.save(&options.output_path)?;

    Ok(page_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::summarize;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_rgb_jpeg(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([10, 120, 200]))
            .save_with_format(path, ImageFormat::Jpeg)
            .unwrap();
    }

    #[test]
    fn test_rgb_jpeg_keeps_original_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.jpg");
        write_rgb_jpeg(&path, 40, 30);

        let jpeg = EmbeddedJpeg::load(&path).unwrap();

        assert_eq!((jpeg.width, jpeg.height), (40, 30));
        assert_eq!(jpeg.color_space, "DeviceRGB");
        assert_eq!(jpeg.data, fs::read(&path).unwrap());
    }

    #[test]
    fn test_grey_jpeg_uses_device_gray() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grey.jpg");
        GrayImage::from_pixel(16, 16, Luma([90]))
            .save_with_format(&path, ImageFormat::Jpeg)
            .unwrap();

        assert_eq!(EmbeddedJpeg::load(&path).unwrap().color_space, "DeviceGray");
    }

    #[test]
    fn test_only_grey_and_rgb_data_is_embedded_as_is() {
        assert_eq!(embeddable_color_space(1), Some("DeviceGray"));
        assert_eq!(embeddable_color_space(3), Some("DeviceRGB"));
        assert_eq!(embeddable_color_space(4), None);
        assert_eq!(embeddable_color_space(2), None);
    }

    #[test]
    fn test_cmyk_jpeg_is_reencoded_as_rgb() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cmyk.jpg");
        let pixels = [20u8, 200, 0, 10].repeat(16 * 16);
        jpeg_encoder::Encoder::new_file(&path, 90)
            .unwrap()
            .encode(&pixels, 16, 16, jpeg_encoder::ColorType::Cmyk)
            .unwrap();

        let jpeg = EmbeddedJpeg::load(&path).unwrap();

        assert_eq!((jpeg.width, jpeg.height), (16, 16));
        assert_eq!(jpeg.color_space, "DeviceRGB");
        let original = fs::read(&path).unwrap();
        assert_eq!(frame_components(&original), Some(4));
        assert_ne!(jpeg.data, original);
        assert_eq!(frame_components(&jpeg.data), Some(3));
    }

    #[test]
    fn test_frame_components_of_encoded_images() {
        let dir = TempDir::new().unwrap();
        let rgb = dir.path().join("rgb.jpg");
        let grey = dir.path().join("grey.jpg");
        write_rgb_jpeg(&rgb, 8, 8);
        GrayImage::from_pixel(8, 8, Luma([0]))
            .save_with_format(&grey, ImageFormat::Jpeg)
            .unwrap();

        assert_eq!(frame_components(&fs::read(&rgb).unwrap()), Some(3));
        assert_eq!(frame_components(&fs::read(&grey).unwrap()), Some(1));
        assert_eq!(frame_components(b"not a jpeg"), None);
        assert_eq!(frame_components(&[0xFF, 0xD8, 0xFF]), None);
    }

    #[test]
    fn test_png_named_jpg_is_reencoded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("actually_png.jpg");
        RgbImage::from_pixel(8, 4, Rgb([0, 0, 0]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let jpeg = EmbeddedJpeg::load(&path).unwrap();

        assert_eq!((jpeg.width, jpeg.height), (8, 4));
        assert_eq!(&jpeg.data[..2], &[0xFFu8, 0xD8]);
    }

    #[test]
    fn test_import_one_page_per_image() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        write_rgb_jpeg(&a, 100, 50);
        write_rgb_jpeg(&b, 80, 60);
        let out = dir.path().join("merged.pdf");

        let pages = import_images(&MergeOptions::new(&[a, b], &out)).unwrap();

        assert_eq!(pages, 2);
        let summary = summarize(&out).unwrap();
        assert_eq!(summary.page_count, 2);
        assert_eq!(summary.image_pages, 2);
    }

    #[test]
    fn test_import_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.jpg");
        fs::write(&bad, b"not an image").unwrap();

        let result = import_images(&MergeOptions::new(&[bad], &dir.path().join("out.pdf")));
        assert!(matches!(result, Err(Error::Image { .. })));
    }

    #[test]
    fn test_import_empty_list() {
        let result = import_images(&MergeOptions::new(&[] as &[PathBuf], Path::new("out.pdf")));
        assert!(matches!(result, Err(Error::NoInputs)));
    }
}
