//! Error types for the CAPTCHA subsystem.

use thiserror::Error;

/// Errors that can occur while extracting or solving a CAPTCHA.
#[derive(Error, Debug)]
pub enum CaptchaError {
    /// None of the configured OCR engines is installed
    #[error("no OCR engine available (tried: {}); install tesseract or gocr, or use manual mode", .tried.join(", "))]
    NoOcrEngine {
        /// Engines that were tried, in priority order
        tried: Vec<String>,
    },

    /// The `src` attribute looked like a data URI but had no payload
    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),

    /// The data URI payload was not valid base64
    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The bytes could not be decoded as an image
    #[error("failed to decode CAPTCHA image: {0}")]
    Image(#[from] image::ImageError),

    /// The image `src` could not be turned into an absolute URL
    #[error("cannot resolve CAPTCHA image URL '{src}': {source}")]
    InvalidUrl {
        /// The raw `src` attribute
        src: String,
        /// URL parse error
        #[source]
        source: url::ParseError,
    },

    /// An OCR engine ran but failed
    #[error("OCR engine {engine} failed: {reason}")]
    Engine {
        /// Engine name
        engine: String,
        /// Failure details (usually the engine's stderr)
        reason: String,
    },

    /// I/O error (temp files, operator input)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CAPTCHA operations.
pub type Result<T> = std::result::Result<T, CaptchaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_engine_display_lists_candidates() {
        let err = CaptchaError::NoOcrEngine {
            tried: vec!["tesseract".to_string(), "gocr".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("tesseract, gocr"));
        assert!(msg.contains("manual mode"));
    }
}
