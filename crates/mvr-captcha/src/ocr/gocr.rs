//! GOCR command-line engine, used when Tesseract is not installed.

use super::{run_on_scratch_file, OcrEngine};
use crate::error::{CaptchaError, Result};
use async_trait::async_trait;
use image::{GrayImage, ImageFormat};
use std::path::PathBuf;
use tokio::process::Command;

/// OCR through the `gocr` binary. GOCR reads PNM natively, so the image is
/// handed over as a PGM file.
#[derive(Debug, Clone)]
pub struct GocrEngine {
    binary: Option<PathBuf>,
}

impl GocrEngine {
    /// Look the binary up on `PATH`.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            binary: which::which("gocr").ok(),
        }
    }

    /// Use a specific binary.
    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }
}

#[async_trait]
impl OcrEngine for GocrEngine {
    fn name(&self) -> &str {
        "gocr"
    }

    fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    async fn recognize(&self, image: &GrayImage) -> Result<String> {
        let binary = self.binary.as_ref().ok_or_else(|| CaptchaError::Engine {
            engine: self.name().to_string(),
            reason: "binary not found on PATH".to_string(),
        })?;

        run_on_scratch_file(self.name(), image, ImageFormat::Pnm, ".pgm", |path| {
            let mut cmd = Command::new(binary);
            cmd.args(["-C", "0-9A-Za-z", "-i"]).arg(path);
            cmd
        })
        .await
    }
}
