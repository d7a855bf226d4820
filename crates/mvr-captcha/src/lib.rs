//! MVR Captcha - locating, decoding and solving the portal's CAPTCHA.
//!
//! # Architecture
//!
//! - **Locate** ([`locate`]): Find the CAPTCHA `<img>` in the form page and
//!   classify its source as inline (data URI) or remote (URL)
//! - **Bitmap** ([`bitmap`]): Decoded CAPTCHA image and OCR preprocessing
//! - **OCR** ([`ocr`]): Pluggable text-from-image engines with availability checks
//! - **Solvers** ([`solver`], [`manual`]): Automatic (OCR) and operator-driven strategies
//! - **Errors** ([`error`]): CAPTCHA-specific error types
//!
//! # Example
//!
//! ```rust,no_run
//! use mvr_captcha::{AutomaticSolver, CaptchaImage, CaptchaSolver};
//! use mvr_core::CaptchaConfig;
//!
//! # async fn run(png: Vec<u8>) -> mvr_captcha::Result<()> {
//! let solver = AutomaticSolver::from_config(&CaptchaConfig::default())?;
//! let image = CaptchaImage::from_bytes(png)?;
//! let guess = solver.solve(&image).await?;
//! println!("OCR guess: {guess}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod bitmap;
pub mod error;
pub mod locate;
pub mod manual;
pub mod ocr;
pub mod solver;

// Re-export commonly used types
pub use bitmap::CaptchaImage;
pub use error::{CaptchaError, Result};
pub use locate::{decode_data_uri, locate_captcha, resolve_src, CaptchaSource};
pub use manual::{ManualSolver, OperatorInput, StdinInput};
pub use ocr::{normalize_guess, select_engine, GocrEngine, OcrEngine, TesseractEngine};
pub use solver::{AutomaticSolver, CaptchaSolver};
