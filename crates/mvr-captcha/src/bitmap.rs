//! In-memory CAPTCHA bitmap and OCR preprocessing.

use crate::error::Result;
use image::{DynamicImage, GrayImage, ImageFormat};
use std::path::Path;

/// A CAPTCHA image decoded from a data URI or a downloaded resource.
///
/// Keeps the original bytes next to the decoded bitmap so callers can
/// re-save or inspect exactly what the portal served.
#[derive(Debug, Clone)]
pub struct CaptchaImage {
    bytes: Vec<u8>,
    image: DynamicImage,
}

impl CaptchaImage {
    /// Decode an image from raw bytes (PNG, JPEG, GIF, ...).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let image = image::load_from_memory(&bytes)?;
        Ok(Self { bytes, image })
    }

    /// Original encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decoded bitmap.
    #[must_use]
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Width and height in pixels.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Greyscale copy of the image.
    #[must_use]
    pub fn grayscale(&self) -> GrayImage {
        self.image.to_luma8()
    }

    /// Greyscale then strict binary threshold: every pixel brighter than
    /// `threshold` becomes white, everything else black. Removes the
    /// anti-aliasing noise the OCR engines trip over.
    #[must_use]
    pub fn binarize(&self, threshold: u8) -> GrayImage {
        let mut gray = self.grayscale();
        for pixel in gray.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
        }
        gray
    }

    /// Write the image as PNG, replacing any existing file.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    /// 4x1 PNG with pixel levels 0, 100, 181, 255.
    pub(crate) fn sample_png() -> Vec<u8> {
        let mut img = RgbImage::new(4, 1);
        for (x, level) in [0u8, 100, 181, 255].into_iter().enumerate() {
            img.put_pixel(u32::try_from(x).unwrap(), 0, Rgb([level, level, level]));
        }
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test]
    fn test_from_bytes_keeps_original() {
        let png = sample_png();
        let captcha = CaptchaImage::from_bytes(png.clone()).expect("decode");
        assert_eq!(captcha.bytes(), png.as_slice());
        assert_eq!(captcha.dimensions(), (4, 1));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(CaptchaImage::from_bytes(b"not an image".to_vec()).is_err());
    }

    #[test]
    fn test_binarize_is_strictly_black_and_white() {
        let captcha = CaptchaImage::from_bytes(sample_png()).expect("decode");
        let binary = captcha.binarize(180);
        let levels: Vec<u8> = binary.pixels().map(|p| p.0[0]).collect();
        assert_eq!(levels, vec![0, 0, 255, 255]);
    }

    #[test]
    fn test_save_png_roundtrip() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("captcha.png");
        let captcha = CaptchaImage::from_bytes(sample_png()).expect("decode");
        captcha.save_png(&path).expect("save");
        let reread = CaptchaImage::from_bytes(std::fs::read(&path).expect("read")).expect("decode");
        assert_eq!(reread.dimensions(), (4, 1));
    }
}
