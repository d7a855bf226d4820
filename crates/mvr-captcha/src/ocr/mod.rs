//! OCR engines for automatic CAPTCHA solving.
//!
//! Engines are external programs discovered on `PATH`. They are tried in the
//! configured priority order and the first one that is installed is used.

mod gocr;
mod tesseract;

pub use gocr::GocrEngine;
pub use tesseract::TesseractEngine;

use crate::error::{CaptchaError, Result};
use async_trait::async_trait;
use image::{GrayImage, ImageFormat};
use mvr_core::OcrEngineKind;
use std::path::Path;
use tokio::process::Command;

/// A text-from-image provider.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short engine name for logs and errors.
    fn name(&self) -> &str;

    /// Whether the engine can be used on this host.
    fn is_available(&self) -> bool;

    /// Read the text in a (preprocessed) CAPTCHA image.
    ///
    /// Returns the raw engine output; callers normalise it.
    async fn recognize(&self, image: &GrayImage) -> Result<String>;
}

/// Build the engine for a configured kind.
#[must_use]
pub fn engine_for(kind: OcrEngineKind) -> Box<dyn OcrEngine> {
    match kind {
        OcrEngineKind::Tesseract => Box::new(TesseractEngine::detect()),
        OcrEngineKind::Gocr => Box::new(GocrEngine::detect()),
    }
}

/// Pick the first available engine from a priority-ordered list.
///
/// # Errors
/// Returns [`CaptchaError::NoOcrEngine`] when none of the candidates is available.
pub fn select_engine(candidates: Vec<Box<dyn OcrEngine>>) -> Result<Box<dyn OcrEngine>> {
    let mut tried = Vec::with_capacity(candidates.len());

    for engine in candidates {
        if engine.is_available() {
            tracing::info!("Using {} for CAPTCHA OCR", engine.name());
            return Ok(engine);
        }
        tracing::debug!("OCR engine {} not available", engine.name());
        tried.push(engine.name().to_string());
    }

    Err(CaptchaError::NoOcrEngine { tried })
}

/// Strip everything but ASCII letters and digits from an OCR result.
#[must_use]
pub fn normalize_guess(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Write `image` to a scratch file with the given format and run `command`
/// with the file path appended by `build`. Returns the engine's stdout.
async fn run_on_scratch_file(
    engine: &str,
    image: &GrayImage,
    format: ImageFormat,
    suffix: &str,
    build: impl FnOnce(&Path) -> Command,
) -> Result<String> {
    let scratch = tempfile::Builder::new()
        .prefix("mvr-captcha-")
        .suffix(suffix)
        .tempfile()?;
    image.save_with_format(scratch.path(), format)?;

    let output = build(scratch.path()).output().await?;
    if !output.status.success() {
        return Err(CaptchaError::Engine {
            engine: engine.to_string(),
            reason: format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeEngine {
        name: &'static str,
        available: bool,
    }

    #[async_trait]
    impl OcrEngine for FakeEngine {
        fn name(&self) -> &str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn recognize(&self, _image: &GrayImage) -> Result<String> {
            Ok(self.name.to_string())
        }
    }

    fn fake(name: &'static str, available: bool) -> Box<dyn OcrEngine> {
        Box::new(FakeEngine { name, available })
    }

    #[test]
    fn test_normalize_guess() {
        assert_eq!(normalize_guess(" a1-B2 \n"), "a1B2");
        assert_eq!(normalize_guess("x.y_z!"), "xyz");
        assert_eq!(normalize_guess("абв12"), "12");
        assert_eq!(normalize_guess(""), "");
    }

    #[test]
    fn test_select_first_available() {
        let engine = select_engine(vec![
            fake("primary", false),
            fake("secondary", true),
            fake("tertiary", true),
        ])
        .expect("an engine is available");
        assert_eq!(engine.name(), "secondary");
    }

    #[test]
    fn test_select_prefers_primary() {
        let engine = select_engine(vec![fake("primary", true), fake("secondary", true)])
            .expect("an engine is available");
        assert_eq!(engine.name(), "primary");
    }

    #[test]
    fn test_select_none_available() {
        let err = select_engine(vec![fake("primary", false), fake("secondary", false)])
            .err()
            .expect("no engine");
        match err {
            CaptchaError::NoOcrEngine { tried } => assert_eq!(tried, vec!["primary", "secondary"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_select_empty_list() {
        assert!(matches!(
            select_engine(Vec::new()),
            Err(CaptchaError::NoOcrEngine { .. })
        ));
    }
}
