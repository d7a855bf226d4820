//! CAPTCHA solving strategies.

use crate::bitmap::CaptchaImage;
use crate::error::Result;
use crate::ocr::{engine_for, normalize_guess, select_engine, OcrEngine};
use async_trait::async_trait;
use mvr_core::CaptchaConfig;

/// CAPTCHA solver trait for pluggable implementations.
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    /// Produce a text guess for the CAPTCHA image.
    async fn solve(&self, image: &CaptchaImage) -> Result<String>;

    /// Whether a wrong guess may be retried with a fresh challenge.
    ///
    /// Operator-entered answers are submitted once and never retried.
    fn allows_retry(&self) -> bool {
        true
    }
}

/// Solves CAPTCHAs with the first available OCR engine.
pub struct AutomaticSolver {
    engine: Box<dyn OcrEngine>,
    preprocess: bool,
    threshold: u8,
}

impl AutomaticSolver {
    /// Create a solver from a priority-ordered list of engines.
    ///
    /// # Errors
    /// Returns [`crate::CaptchaError::NoOcrEngine`] if none of them is available.
    pub fn new(candidates: Vec<Box<dyn OcrEngine>>, preprocess: bool, threshold: u8) -> Result<Self> {
        let engine = select_engine(candidates)?;
        Ok(Self {
            engine,
            preprocess,
            threshold,
        })
    }

    /// Create a solver using the engines and preprocessing from the configuration.
    pub fn from_config(config: &CaptchaConfig) -> Result<Self> {
        let candidates = config.engines.iter().copied().map(engine_for).collect();
        Self::new(candidates, config.preprocess, config.threshold)
    }

    /// Name of the selected engine.
    #[must_use]
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }
}

#[async_trait]
impl CaptchaSolver for AutomaticSolver {
    async fn solve(&self, image: &CaptchaImage) -> Result<String> {
        let prepared = if self.preprocess {
            image.binarize(self.threshold)
        } else {
            image.grayscale()
        };

        let raw = self.engine.recognize(&prepared).await?;
        let guess = normalize_guess(&raw);
        tracing::info!(engine = self.engine.name(), "OCR result: '{}'", guess);
        Ok(guess)
    }
}
