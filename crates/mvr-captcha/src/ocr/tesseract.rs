//! Tesseract command-line engine.

use super::{run_on_scratch_file, OcrEngine};
use crate::error::{CaptchaError, Result};
use async_trait::async_trait;
use image::{GrayImage, ImageFormat};
use std::path::PathBuf;
use tokio::process::Command;

/// Characters the portal uses in its challenges.
const WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// OCR through the `tesseract` binary, treating the image as a single text line.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: Option<PathBuf>,
}

impl TesseractEngine {
    /// Look the binary up on `PATH`.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            binary: which::which("tesseract").ok(),
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
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    async fn recognize(&self, image: &GrayImage) -> Result<String> {
        let binary = self.binary.as_ref().ok_or_else(|| CaptchaError::Engine {
            engine: self.name().to_string(),
            reason: "binary not found on PATH".to_string(),
        })?;

        run_on_scratch_file(self.name(), image, ImageFormat::Png, ".png", |path| {
            let mut cmd = Command::new(binary);
            cmd.arg(path)
                .arg("stdout")
                .args(["--psm", "7"])
                .arg("-c")
                .arg(format!("tessedit_char_whitelist={WHITELIST}"));
            cmd
        })
        .await
    }
}
